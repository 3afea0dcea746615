/// One result of a folder listing, in the caller's namespace.
///
/// Container paths always end with `/`; other paths never do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEntry {
    pub path: String,
    pub is_container: bool,
}
