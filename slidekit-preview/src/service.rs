//! Studio: the operation surface exposed by the daemon and the CLI.

use serde::{Deserialize, Serialize};

use slidekit_compiler::{CompileRequest, CompiledDocument, Compiler};
use slidekit_core::{Block, BoundVariables, Instance, InstanceId, TemplateId, TemplateStore};

use crate::error::PreviewError;
use crate::supervisor::{ProcessSupervisor, StartOptions};

/// Compile a deck and launch a preview for it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StartPreviewRequest {
    #[serde(flatten)]
    pub compile: CompileRequest,
    #[serde(flatten)]
    pub options: StartOptions,
}

/// Recompile a live preview with new content. The template is the one the
/// instance was started with.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePreviewRequest {
    #[serde(default)]
    pub variables: BoundVariables,
    #[serde(default)]
    pub blocks: Option<Vec<Block>>,
}

pub struct Studio {
    compiler: Compiler,
    supervisor: ProcessSupervisor,
}

impl Studio {
    pub fn new(store: TemplateStore, supervisor: ProcessSupervisor) -> Self {
        Self {
            compiler: Compiler::new(store),
            supervisor,
        }
    }

    pub fn supervisor(&self) -> &ProcessSupervisor {
        &self.supervisor
    }

    // -----------------------------------------------------------------------
    // Templates
    // -----------------------------------------------------------------------

    pub fn list_templates(&self) -> Result<Vec<TemplateId>, PreviewError> {
        Ok(self.compiler.store().list()?)
    }

    pub fn template_preview(&self, id: &TemplateId) -> Result<String, PreviewError> {
        Ok(self.compiler.store().preview(id)?)
    }

    pub fn template_blocks(&self, id: &TemplateId) -> Result<Vec<Block>, PreviewError> {
        Ok(self.compiler.store().blocks(id)?)
    }

    pub fn compile(&self, request: &CompileRequest) -> Result<CompiledDocument, PreviewError> {
        Ok(self.compiler.compile_request(request)?)
    }

    // -----------------------------------------------------------------------
    // Previews
    // -----------------------------------------------------------------------

    pub async fn start_preview(
        &self,
        request: &StartPreviewRequest,
    ) -> Result<Instance, PreviewError> {
        let (template_id, blocks) = request.compile.validate()?;
        let document = self
            .compiler
            .compile(&template_id, &request.compile.variables, blocks)?;
        self.supervisor
            .start(&template_id, document.as_str(), &request.options)
            .await
    }

    pub async fn update_preview(
        &self,
        id: &InstanceId,
        request: &UpdatePreviewRequest,
    ) -> Result<bool, PreviewError> {
        let blocks = request
            .blocks
            .as_deref()
            .ok_or_else(|| PreviewError::InvalidRequest("missing required parameter: blocks".into()))?;
        let instance = self.supervisor.get(id).await?;
        let document = self
            .compiler
            .compile(&instance.template_id, &request.variables, blocks)?;
        self.supervisor.update(id, document.as_str()).await?;
        Ok(true)
    }

    pub async fn stop_preview(&self, id: &InstanceId) -> Result<bool, PreviewError> {
        self.supervisor.stop(id).await?;
        Ok(true)
    }

    pub async fn list_previews(&self) -> Vec<Instance> {
        self.supervisor.list().await
    }

    pub async fn get_preview(&self, id: &InstanceId) -> Result<Instance, PreviewError> {
        self.supervisor.get(id).await
    }

    /// Stop every preview and remove the preview root.
    pub async fn shutdown(&self) -> Result<(), PreviewError> {
        self.supervisor.cleanup_all().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_request_reads_flat_json() {
        let request: StartPreviewRequest = serde_json::from_str(
            r#"{"templateId":"demo","variables":{"companyName":"Acme"},"blocks":[],"port":4000,"theme":"seriph"}"#,
        )
        .expect("parse");
        assert_eq!(request.compile.template_id, "demo");
        assert_eq!(request.options.port, Some(4000));
        assert_eq!(request.options.theme.as_deref(), Some("seriph"));
        assert!(!request.options.remote);
        assert_eq!(request.compile.blocks.as_deref().map(<[Block]>::len), Some(0));
    }
}
