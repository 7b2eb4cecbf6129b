use stockledger_core::Actor;

/// Who is calling, as recorded on every activity log entry.
///
/// Inserted by [`crate::middleware::actor_middleware`] for every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorContext {
    actor: Actor,
}

impl ActorContext {
    pub fn new(actor: Actor) -> Self {
        Self { actor }
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }
}
