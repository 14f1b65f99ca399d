//! Genesis Block Creation
//!
//! Every node derives the same height-0 block from the agreed
//! `genesis_content`; nothing in it depends on the local clock or identity.

use shared_types::{Block, BlockContent, NodeIdentity};
use std::collections::BTreeMap;

/// Build the deterministic genesis block for `genesis_content`.
pub fn build_genesis_block(genesis_content: &[u8]) -> Block {
    let content = BlockContent {
        previous_block_hash: None,
        creator: NodeIdentity::unassigned(),
        transactions: BTreeMap::new(),
        block_generated_time: 0,
        genesis_content: genesis_content.to_vec(),
        genesis_block_hash: None,
        memo: String::new(),
    };

    let mut block = Block {
        height: 0,
        content,
        block_content_hash: [0u8; 32],
        confirmations: BTreeMap::new(),
        block_finalization_time: 0,
        final_hash: [0u8; 32],
    };
    block.block_content_hash = block.compute_content_hash();
    block.final_hash = block.compute_final_hash();
    block
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genesis_is_deterministic() {
        assert_eq!(
            build_genesis_block(b"round-0").final_hash,
            build_genesis_block(b"round-0").final_hash
        );
    }

    #[test]
    fn test_genesis_content_changes_hash() {
        assert_ne!(
            build_genesis_block(b"a").final_hash,
            build_genesis_block(b"b").final_hash
        );
    }

    #[test]
    fn test_genesis_has_no_links() {
        let g = build_genesis_block(b"x");
        assert!(g.is_genesis());
        assert!(g.content.previous_block_hash.is_none());
        assert!(g.content.genesis_block_hash.is_none());
        assert_eq!(g.block_content_hash, g.compute_content_hash());
    }
}
