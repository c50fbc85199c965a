use askql_core::AskqlError;
use std::fmt::Write;

/// A worked question/SQL pair shown to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptExample {
    pub question: String,
    pub sql: String,
}

/// Builds the single instruction string sent to the model.
///
/// Building is pure: the same question, schema and limit always produce the
/// same bytes.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    dialect: String,
    max_question_chars: usize,
    hints: Vec<String>,
    examples: Vec<PromptExample>,
}

impl PromptBuilder {
    pub fn new(max_question_chars: usize) -> Self {
        Self {
            dialect: "PostgreSQL".into(),
            max_question_chars,
            hints: Vec::new(),
            examples: Vec::new(),
        }
    }

    pub fn with_dialect(mut self, dialect: impl Into<String>) -> Self {
        self.dialect = dialect.into();
        self
    }

    pub fn with_hints(mut self, hints: Vec<String>) -> Self {
        self.hints = hints;
        self
    }

    pub fn with_examples(mut self, examples: Vec<PromptExample>) -> Self {
        self.examples = examples;
        self
    }

    /// Rejects empty and oversized questions; returns the trimmed question.
    pub fn check_question<'q>(&self, question: &'q str) -> Result<&'q str, AskqlError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AskqlError::EmptyQuestion);
        }
        let len = question.chars().count();
        if len > self.max_question_chars {
            return Err(AskqlError::InputTooLarge {
                len,
                limit: self.max_question_chars,
            });
        }
        Ok(question)
    }

    pub fn build(&self, question: &str, schema: &str, limit: usize) -> Result<String, AskqlError> {
        let question = self.check_question(question)?;

        let mut prompt = String::new();
        let _ = writeln!(
            prompt,
            "You are a {} SQL generator. Translate the user question into exactly one read-only SQL query.",
            self.dialect
        );
        prompt.push_str("Return ONLY the SQL statement. No markdown, no explanations, no comments.\n\n");
        prompt.push_str("AVAILABLE TABLES AND COLUMNS:\n");
        prompt.push_str(schema.trim_end());
        prompt.push_str("\n\n");
        let _ = writeln!(prompt, "USER QUESTION: {question}\n");
        prompt.push_str("RULES:\n");
        prompt.push_str("- Use only the tables and columns listed above.\n");
        prompt.push_str("- Write a single SELECT statement (a WITH clause is allowed); never modify data.\n");
        let _ = writeln!(prompt, "- Always add LIMIT {limit}.");
        for hint in &self.hints {
            let _ = writeln!(prompt, "- {hint}");
        }
        if !self.examples.is_empty() {
            prompt.push_str("\nEXAMPLES:\n");
            for example in &self.examples {
                let _ = writeln!(prompt, "Question: {}", example.question);
                let _ = writeln!(prompt, "SQL: {}", example.sql.trim());
            }
        }
        prompt.push_str("\nSQL:");
        Ok(prompt)
    }
}
