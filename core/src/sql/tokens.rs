/// SQL keywords, punctuation and operators.
///
/// Tokens render as their canonical upper-case text. Spacing between tokens is
/// decided by the renderer (see `chunk_needs_space`), never by the token itself.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Token {
    // Keywords
    SELECT,
    FROM,
    WHERE,
    AND,
    OR,
    NOT,
    IN,
    EXISTS,
    AS,
    ORDER,
    BY,
    ASC,
    DESC,
    LIMIT,
    OFFSET,
    INSERT,
    INTO,
    VALUES,
    DELETE,

    // Punctuation
    LPAREN,
    RPAREN,
    COMMA,
    SEMI,
    DOT,
    STAR,

    // Comparison
    EQ,
    NE,
    LT,
    GT,
    LE,
    GE,
}

impl Token {
    /// Returns the SQL text for this token.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Token::SELECT => "SELECT",
            Token::FROM => "FROM",
            Token::WHERE => "WHERE",
            Token::AND => "AND",
            Token::OR => "OR",
            Token::NOT => "NOT",
            Token::IN => "IN",
            Token::EXISTS => "EXISTS",
            Token::AS => "AS",
            Token::ORDER => "ORDER",
            Token::BY => "BY",
            Token::ASC => "ASC",
            Token::DESC => "DESC",
            Token::LIMIT => "LIMIT",
            Token::OFFSET => "OFFSET",
            Token::INSERT => "INSERT",
            Token::INTO => "INTO",
            Token::VALUES => "VALUES",
            Token::DELETE => "DELETE",
            Token::LPAREN => "(",
            Token::RPAREN => ")",
            Token::COMMA => ",",
            Token::SEMI => ";",
            Token::DOT => ".",
            Token::STAR => "*",
            Token::EQ => "=",
            Token::NE => "<>",
            Token::LT => "<",
            Token::GT => ">",
            Token::LE => "<=",
            Token::GE => ">=",
        }
    }

    /// Comparison operators are always surrounded by spaces.
    #[inline]
    pub const fn is_operator(&self) -> bool {
        matches!(
            self,
            Token::EQ | Token::NE | Token::LT | Token::GT | Token::LE | Token::GE
        )
    }
}

impl core::fmt::Display for Token {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
