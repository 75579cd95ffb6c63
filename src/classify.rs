//! Syntactic detection of the `enhance` entry point in lens scripts.
//!
//! Detection is pattern matching, not parsing: each recognized declaration
//! form is one regex, kept as an explicit tagged variant so the rule set is
//! enumerable and testable. Pathological-but-valid scripts can be missed;
//! that is an accepted limitation.
use regex::Regex;

/// The declaration forms that count as an enhance entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationForm {
    /// `function enhance(...)`
    FunctionDeclaration,
    /// `const enhance = ...`
    ConstBinding,
    /// `let enhance = ...`
    LetBinding,
    /// `var enhance = ...`
    VarBinding,
    /// `enhance: function ...` in an object literal
    ObjectMethod,
    /// `enhance: async function ...` in an object literal
    AsyncObjectMethod,
    /// `enhance: enhance` shorthand aliasing an existing binding
    ShorthandAlias,
}

impl DeclarationForm {
    /// Every form, in the order patterns are tried.
    pub const ALL: [DeclarationForm; 7] = [
        DeclarationForm::FunctionDeclaration,
        DeclarationForm::ConstBinding,
        DeclarationForm::LetBinding,
        DeclarationForm::VarBinding,
        DeclarationForm::ObjectMethod,
        DeclarationForm::AsyncObjectMethod,
        DeclarationForm::ShorthandAlias,
    ];

    fn pattern(self) -> &'static str {
        match self {
            DeclarationForm::FunctionDeclaration => r"function\s+enhance\s*\(",
            DeclarationForm::ConstBinding => r"const\s+enhance\s*=",
            DeclarationForm::LetBinding => r"let\s+enhance\s*=",
            DeclarationForm::VarBinding => r"var\s+enhance\s*=",
            DeclarationForm::ObjectMethod => r"enhance\s*:\s*function",
            DeclarationForm::AsyncObjectMethod => r"enhance\s*:\s*async\s+function",
            DeclarationForm::ShorthandAlias => r"enhance:\s*enhance",
        }
    }
}

/// Compiled pattern set for entry-point detection.
pub struct Classifier {
    patterns: Vec<(DeclarationForm, Regex)>,
}

impl Classifier {
    pub fn new() -> Classifier {
        let patterns = DeclarationForm::ALL
            .iter()
            .map(|&form| {
                let regex =
                    Regex::new(form.pattern()).expect("regex for enhance declaration form");
                (form, regex)
            })
            .collect();
        Classifier { patterns }
    }

    /// First declaration form matched by the text, if any.
    pub fn detect(&self, text: &str) -> Option<DeclarationForm> {
        self.patterns
            .iter()
            .find(|(_, regex)| regex.is_match(text))
            .map(|(form, _)| *form)
    }

    /// Whether the text defines a recognizable enhance entry point.
    pub fn has_entry_point(&self, text: &str) -> bool {
        self.detect(text).is_some()
    }
}

impl Default for Classifier {
    fn default() -> Classifier {
        Classifier::new()
    }
}
