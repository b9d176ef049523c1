//! Deterministic block ordering.

use slidekit_core::Block;

/// Order blocks ascending by `order`.
///
/// The sort is stable: blocks sharing an `order` keep their input order.
pub fn order_blocks(blocks: &[Block]) -> Vec<&Block> {
    let mut ordered: Vec<&Block> = blocks.iter().collect();
    ordered.sort_by_key(|b| b.order);
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(id: &str, order: i64) -> Block {
        Block {
            id: id.to_string(),
            function: format!("{id}Macro"),
            label: String::new(),
            description: String::new(),
            variables: vec![],
            order,
        }
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(order_blocks(&[]).is_empty());
    }

    #[test]
    fn sorts_ascending() {
        let blocks = vec![block("c", 3), block("a", 1), block("b", 2)];
        let ids: Vec<_> = order_blocks(&blocks).iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }

    #[test]
    fn equal_orders_keep_input_position() {
        let blocks = vec![
            block("x", 1),
            block("first-zero", 0),
            block("y", 1),
            block("second-zero", 0),
            block("z", 1),
        ];
        let ids: Vec<_> = order_blocks(&blocks).iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, ["first-zero", "second-zero", "x", "y", "z"]);
    }

    #[test]
    fn stable_and_sorted_over_generated_inputs() {
        // Deterministic pseudo-random orders; checks both properties on each input.
        let mut seed: u64 = 0x9e37_79b9_7f4a_7c15;
        for len in 0..40 {
            let blocks: Vec<Block> = (0..len)
                .map(|i| {
                    seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                    block(&format!("b{i}"), ((seed >> 33) % 4) as i64 - 1)
                })
                .collect();
            let ordered = order_blocks(&blocks);
            assert_eq!(ordered.len(), blocks.len());
            for pair in ordered.windows(2) {
                assert!(pair[0].order <= pair[1].order, "not sorted: {pair:?}");
                if pair[0].order == pair[1].order {
                    let pos = |b: &Block| blocks.iter().position(|x| x.id == b.id).unwrap();
                    assert!(pos(pair[0]) < pos(pair[1]), "not stable: {pair:?}");
                }
            }
        }
    }
}
