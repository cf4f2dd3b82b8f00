/// Node identity, unique within one editing process
pub type Oid = u64;

/// Oid reserved for the adopted editing root
pub const ROOT_OID: Oid = 1;

/// Sequential ID generator for document nodes
///
/// The first id handed out is [`ROOT_OID`], so adopting the editable root
/// before anything else gives it id 1.
#[derive(Clone, Debug, Default)]
pub struct IDGenerator {
    count: Oid,
}

impl IDGenerator {
    pub fn new() -> Self {
        Self { count: 0 }
    }

    /// Generate next sequential ID
    pub fn new_id(&mut self) -> Oid {
        self.count += 1;
        self.count
    }

    /// Record an id produced elsewhere (replayed history, remote steps) so
    /// later ids never collide with it
    pub fn observe(&mut self, id: Oid) {
        if id > self.count {
            self.count = id;
        }
    }

    /// Last id handed out or observed
    pub fn current(&self) -> Oid {
        self.count
    }
}
