/// Client-side ID generator for new columns and cells
/// Generates prefixed, lowercase ULIDs like "col-01hv..." and "cell-01hv..."
/// that stay unique and increasing within one session

use ulid::{Generator, Ulid};

pub const COLUMN_PREFIX: &str = "col";
pub const CELL_PREFIX: &str = "cell";

pub struct IdGenerator {
    /// Monotonic ULID source (unique even within the same millisecond)
    generator: Generator,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self {
            generator: Generator::new(),
        }
    }

    /// Generate the next column ID
    pub fn next_column_id(&mut self) -> String {
        self.next_with_prefix(COLUMN_PREFIX)
    }

    /// Generate the next cell ID
    pub fn next_cell_id(&mut self) -> String {
        self.next_with_prefix(CELL_PREFIX)
    }

    fn next_with_prefix(&mut self, prefix: &str) -> String {
        // The monotonic counter only overflows after 2^80 IDs in one millisecond
        let ulid = self.generator.generate().unwrap_or_else(|_| Ulid::new());
        format!("{}-{}", prefix, ulid.to_string().to_ascii_lowercase())
    }

    /// Check whether an ID was produced with the given prefix
    pub fn has_prefix(id: &str, prefix: &str) -> bool {
        id.strip_prefix(prefix)
            .and_then(|rest| rest.strip_prefix('-'))
            .map_or(false, |ulid| Ulid::from_string(&ulid.to_ascii_uppercase()).is_ok())
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
