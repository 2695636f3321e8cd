use crate::cid::Cid;

/// An immutable (identifier, payload) pair: the unit of storage and transfer.
///
/// The store never checks that `cid` actually addresses `data`; callers that
/// build blocks from content should use [`Block::from_data`].
#[derive(Clone, PartialEq, Eq)]
pub struct Block {
    cid: Cid,
    data: Vec<u8>,
}

impl Block {
    /// Pair an existing identifier with its payload.
    pub fn new(cid: Cid, data: Vec<u8>) -> Self {
        Self { cid, data }
    }

    /// Build a block whose identifier is derived from the payload.
    pub fn from_data(data: Vec<u8>) -> Self {
        let cid = Cid::for_data(&data);
        Self { cid, data }
    }

    pub fn cid(&self) -> &Cid {
        &self.cid
    }

    /// Raw payload bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Payload length in bytes.
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn into_parts(self) -> (Cid, Vec<u8>) {
        (self.cid, self.data)
    }
}

impl std::fmt::Debug for Block {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Block")
            .field("cid", &self.cid)
            .field("size", &self.data.len())
            .finish()
    }
}
