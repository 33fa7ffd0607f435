// Encoding of trie nodes, the preimage of every node hash
use bytes::BufMut;
use ethroot_rlp::{
    encode::{RLPEncode, encode_length, list_length},
    structs::Encoder,
};

use super::node::{BranchNode, ExtensionNode, LeafNode, Node};

impl BranchNode {
    fn payload_length(&self) -> usize {
        self.choices
            .iter()
            .fold(self.value.as_slice().length(), |acc, child| {
                acc + child.compute_hash().length()
            })
    }
}

impl RLPEncode for BranchNode {
    fn encode(&self, buf: &mut dyn BufMut) {
        encode_length(self.payload_length(), buf);
        for child in self.choices.iter() {
            child.compute_hash().encode(buf);
        }
        self.value.as_slice().encode(buf);
    }

    fn length(&self) -> usize {
        list_length(self.payload_length())
    }
}

impl RLPEncode for ExtensionNode {
    fn encode(&self, buf: &mut dyn BufMut) {
        Encoder::new(buf)
            .encode_bytes(&self.prefix.encode_compact())
            .encode_field(&self.child.compute_hash())
            .finish();
    }
}

impl RLPEncode for LeafNode {
    fn encode(&self, buf: &mut dyn BufMut) {
        Encoder::new(buf)
            .encode_bytes(&self.partial.encode_compact())
            .encode_bytes(&self.value)
            .finish()
    }
}

impl RLPEncode for Node {
    fn encode(&self, buf: &mut dyn BufMut) {
        match self {
            Node::Branch(n) => n.encode(buf),
            Node::Extension(n) => n.encode(buf),
            Node::Leaf(n) => n.encode(buf),
        }
    }

    fn length(&self) -> usize {
        match self {
            Node::Branch(n) => n.length(),
            Node::Extension(n) => n.length(),
            Node::Leaf(n) => n.length(),
        }
    }
}
