/// Reusable SQL text accumulator.
///
/// Tokens are joined by single spaces. A builder can hold several statements
/// so callers can batch them into one round trip; every `create_*` method of
/// a statement builder appends to it and returns only the text it appended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryBuilder {
    text: String,
}

impl QueryBuilder {
    /// An empty builder.
    #[must_use]
    pub const fn new() -> Self {
        Self { text: String::new() }
    }

    /// Appends a token.
    pub fn write(&mut self, token: impl AsRef<str>) -> &mut Self {
        let token = token.as_ref().trim();
        if token.is_empty() {
            return self;
        }
        if !self.text.is_empty() {
            self.text.push(' ');
        }
        self.text.push_str(token);
        self
    }

    /// Appends a comma separated list.
    pub fn list<I, S>(&mut self, items: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = items.into_iter().map(|s| s.as_ref().to_string()).collect::<Vec<_>>();
        self.write(joined.join(", "))
    }

    /// Appends a parenthesized comma separated list: `( a, b )`.
    pub fn group<I, S>(&mut self, items: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.write("(").list(items).write(")")
    }

    /// Terminates the current statement.
    pub fn end(&mut self) -> &mut Self {
        self.write(";")
    }

    /// Accumulated text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Accumulated length in bytes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.text.len()
    }

    /// Whether nothing has been written.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Discards all accumulated text.
    pub fn clear(&mut self) -> &mut Self {
        self.text.clear();
        self
    }

    /// Text written since byte offset `start`.
    #[must_use]
    pub fn since(&self, start: usize) -> &str {
        self.text.get(start..).unwrap_or_default().trim()
    }
}

#[cfg(test)]
mod tests {
    use super::QueryBuilder;

    #[test]
    fn tokens_are_space_separated() {
        let mut builder = QueryBuilder::new();
        builder.write("SELECT").list(["[A]", "[B]"]).write("FROM").write("[T]").end();
        assert_eq!(builder.as_str(), "SELECT [A], [B] FROM [T] ;");

        let start = builder.len();
        builder.write("DELETE FROM").write("[T]").end();
        assert_eq!(builder.since(start), "DELETE FROM [T] ;");
        assert_eq!(builder.as_str(), "SELECT [A], [B] FROM [T] ; DELETE FROM [T] ;");
    }

    #[test]
    fn groups() {
        let mut builder = QueryBuilder::new();
        builder.write("VALUES").group(["@A", "@B"]);
        assert_eq!(builder.as_str(), "VALUES ( @A, @B )");
    }
}
