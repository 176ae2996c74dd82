//! Field-path tracker (spec.md §4.C): immutable dual "from-root"/"from-parent"
//! paths used while walking into nested documents during filter compilation.
//!
//! `from_root` is the full dotted path from the document root; `from_parent`
//! resets to empty every time the walk crosses into a `nested`-mapped list,
//! because Elasticsearch/OpenSearch nested queries address fields relative
//! to the nested document, not the outer one.

/// The separator used inside the hidden `__counts` field's keys, chosen
/// because `.` would be ambiguous with object-nesting paths there (spec.md
/// §3 invariant).
pub const LIST_COUNTS_PATH_SEPARATOR: &str = "|";

/// The hidden document field every indexed type carries list lengths under.
pub const COUNTS_FIELD: &str = "__counts";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldPath {
    from_root: Vec<String>,
    from_parent: Vec<String>,
}

impl FieldPath {
    pub fn root() -> Self {
        FieldPath::default()
    }

    /// Extends both the root-relative and parent-relative paths by one
    /// segment.
    pub fn append(&self, segment: impl Into<String>) -> Self {
        let segment = segment.into();
        let mut from_root = self.from_root.clone();
        from_root.push(segment.clone());
        let mut from_parent = self.from_parent.clone();
        from_parent.push(segment);
        FieldPath {
            from_root,
            from_parent,
        }
    }

    /// Enters a nested document: `from_root` is preserved, `from_parent` is
    /// reset to empty so subsequent nested-query field references are
    /// relative to the new nested scope.
    pub fn nested(&self) -> Self {
        FieldPath {
            from_root: self.from_root.clone(),
            from_parent: Vec::new(),
        }
    }

    pub fn from_root_dotted(&self) -> String {
        self.from_root.join(".")
    }

    pub fn from_parent_dotted(&self) -> String {
        self.from_parent.join(".")
    }

    pub fn from_root(&self) -> &[String] {
        &self.from_root
    }

    pub fn from_parent(&self) -> &[String] {
        &self.from_parent
    }

    /// Maps the current location to the document's hidden `__counts` field,
    /// relative to the current nested scope the same way any other field
    /// reference is (spec.md §4.E: inside an `any_satisfy` nested query, the
    /// inner operator addresses fields relative to the nested document, not
    /// the root). List nesting is flattened into a single pipe-separated key
    /// so it can't collide with `.`-separated object nesting (spec.md §3
    /// invariant, §4.E list-count filters, §8 scenario S9).
    pub fn counts_path(&self) -> String {
        format!(
            "{COUNTS_FIELD}.{}",
            self.from_parent.join(LIST_COUNTS_PATH_SEPARATOR)
        )
    }
}
