//! The `gate` chat command grammar.
//!
//! `gate <id> allow-once|allow-always|deny`, where either token order is
//! accepted as long as exactly one token is a decision alias.

use thiserror::Error;

use crate::request::ApprovalDecision;

/// A parsed `gate` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateCommand {
    /// The approval record the decision targets (raw token; the caller
    /// resolves it against the manager).
    pub id: String,
    /// The decision taken.
    pub decision: ApprovalDecision,
}

/// Why a `gate` command failed to parse.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandParseError {
    /// Expected exactly two tokens after the verb.
    #[error("expected '<id> <decision>', got {0} token(s)")]
    WrongTokenCount(usize),
    /// Neither token is a recognised decision alias.
    #[error("no decision found; use allow-once, allow-always, or deny")]
    NoDecision,
    /// Both tokens are decision aliases, so no id remains.
    #[error("two decisions and no approval id")]
    TwoDecisions,
}

/// Map one token to a decision, honouring the alias table.
fn parse_decision_alias(token: &str) -> Option<ApprovalDecision> {
    match token.to_ascii_lowercase().as_str() {
        "allow-once" | "allow" | "once" | "allowonce" => Some(ApprovalDecision::AllowOnce),
        "allow-always" | "always" | "allowalways" | "remember" => {
            Some(ApprovalDecision::AllowAlways)
        },
        "deny" | "reject" | "block" => Some(ApprovalDecision::Deny),
        _ => None,
    }
}

/// Parse the arguments of a `gate` command.
///
/// Accepts the full command (`gate <id> <decision>`) or just its arguments;
/// a leading `gate` token is skipped.
///
/// # Errors
///
/// Returns a [`CommandParseError`] when the input is not exactly one id
/// token plus one decision alias.
pub fn parse_gate_command(input: &str) -> Result<GateCommand, CommandParseError> {
    let mut tokens: Vec<&str> = input.split_whitespace().collect();
    if tokens.first().is_some_and(|t| t.eq_ignore_ascii_case("gate")) {
        tokens.remove(0);
    }

    if tokens.len() != 2 {
        return Err(CommandParseError::WrongTokenCount(tokens.len()));
    }

    match (parse_decision_alias(tokens[0]), parse_decision_alias(tokens[1])) {
        (Some(_), Some(_)) => Err(CommandParseError::TwoDecisions),
        (Some(decision), None) => Ok(GateCommand {
            id: tokens[1].to_string(),
            decision,
        }),
        (None, Some(decision)) => Ok(GateCommand {
            id: tokens[0].to_string(),
            decision,
        }),
        (None, None) => Err(CommandParseError::NoDecision),
    }
}
