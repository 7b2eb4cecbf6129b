use stockledger_core::MaterialId;

/// A command targets exactly one material (command abstraction).
///
/// Commands represent **intent** ("sell 4 metres of M"); the material decides
/// whether to accept it and answers with events ("4 metres sold").
///
/// The target is what the ledger serializes on: two commands against the same
/// material never run their read-modify-write concurrently, commands against
/// different materials may.
pub trait Command: Clone + core::fmt::Debug + Send + Sync + 'static {
    fn target_material(&self) -> MaterialId;
}
