//! Ballot-cell grammar.
//!
//! ```text
//! cell     := '-' | '' | '0' | '1' | aggregate | formula
//! aggregate:= 'maj(' names ')' | 'quota(' INT ';' names ')' | 'rule(' FRACTION ';' names ')'
//! formula  := unary (('&' | '|') unary)*
//! unary    := '~' unary | NAME | '(' formula ')'
//! ```
//!
//! A formula that reduces to a single (possibly negated) literal is a
//! plain delegation. `&` and `|` share one precedence level and associate
//! to the left.

use std::sync::OnceLock;

use regex::Regex;

use crate::agent::Roster;
use crate::error::CellError;
use crate::expression::{Bit, DelegationExpression, Formula, Fraction};

fn aggregate_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(maj|quota|rule)\s*\((.*)\)$").expect("aggregate pattern is valid")
    })
}

/// Parses one ballot cell against `roster`.
///
/// # Errors
///
/// Returns a [`CellError`] describing the first grammar or reference
/// violation. Malformed cells are never treated as "unresolved".
///
/// # Example
///
/// ```rust
/// use unravel_ballot::{parse_cell, DelegationExpression, Roster};
///
/// let roster = Roster::with_default_names(3);
/// let expr = parse_cell("quota(2; A B C)", &roster).unwrap();
/// assert!(matches!(expr, DelegationExpression::Quota { threshold: 2, .. }));
/// ```
pub fn parse_cell(text: &str, roster: &Roster) -> Result<DelegationExpression, CellError> {
    let cell = text.trim();
    let expr = match cell {
        "" | "-" => DelegationExpression::Blank,
        "0" => DelegationExpression::DirectVote(Bit::Zero),
        "1" => DelegationExpression::DirectVote(Bit::One),
        _ => match aggregate_pattern().captures(cell) {
            Some(caps) => {
                let body_offset = caps.get(2).map(|m| m.start()).unwrap_or(0);
                parse_aggregate(&caps[1], &caps[2], body_offset, roster)?
            }
            None => match FormulaParser::new(cell, roster)?.parse()? {
                Formula::Literal { agent, negated } => DelegationExpression::Delegate {
                    target: agent,
                    negated,
                },
                formula => DelegationExpression::Formula(formula),
            },
        },
    };
    expr.validate()?;
    Ok(expr)
}

fn parse_aggregate(
    form: &str,
    body: &str,
    offset: usize,
    roster: &Roster,
) -> Result<DelegationExpression, CellError> {
    if form == "maj" {
        return Ok(DelegationExpression::Majority {
            participants: parse_names(body, roster)?,
        });
    }

    let (head, names) = body.split_once(';').ok_or(CellError::UnexpectedEnd {
        expected: "';' after the threshold",
    })?;
    let participants = parse_names(names, roster)?;
    let head = head.trim();

    if form == "quota" {
        let threshold = head.parse::<usize>().map_err(|_| CellError::UnexpectedToken {
            found: head.to_string(),
            position: offset,
        })?;
        Ok(DelegationExpression::Quota {
            participants,
            threshold,
        })
    } else {
        Ok(DelegationExpression::VotingRule {
            participants,
            fraction: parse_fraction(head)?,
        })
    }
}

fn parse_names(text: &str, roster: &Roster) -> Result<Vec<crate::AgentId>, CellError> {
    text.split_whitespace()
        .map(|name| {
            roster
                .lookup(name)
                .ok_or_else(|| CellError::UnknownAgent(name.to_string()))
        })
        .collect()
}

/// Parses `n/d`, a decimal such as `0.6`, or `1` into an exact fraction.
pub fn parse_fraction(text: &str) -> Result<Fraction, CellError> {
    let invalid = || CellError::InvalidFraction(text.to_string());

    if let Some((n, d)) = text.split_once('/') {
        let n = n.trim().parse::<u32>().map_err(|_| invalid())?;
        let d = d.trim().parse::<u32>().map_err(|_| invalid())?;
        return Fraction::new(n, d).ok_or_else(invalid);
    }

    let (whole, frac) = text.split_once('.').unwrap_or((text, ""));
    if frac.len() > 6 || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    let whole = whole.parse::<u32>().map_err(|_| invalid())?;
    let scale = 10u32.pow(frac.len() as u32);
    let frac = if frac.is_empty() {
        0
    } else {
        frac.parse::<u32>().map_err(|_| invalid())?
    };
    let numerator = whole
        .checked_mul(scale)
        .and_then(|w| w.checked_add(frac))
        .ok_or_else(invalid)?;
    Fraction::new(numerator, scale).ok_or_else(invalid)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Name(&'a str),
    Tilde,
    And,
    Or,
    Open,
    Close,
}

impl Token<'_> {
    fn text(&self) -> String {
        match self {
            Token::Name(n) => (*n).to_string(),
            Token::Tilde => "~".to_string(),
            Token::And => "&".to_string(),
            Token::Or => "|".to_string(),
            Token::Open => "(".to_string(),
            Token::Close => ")".to_string(),
        }
    }
}

fn tokenize(text: &str) -> Result<Vec<(usize, Token<'_>)>, CellError> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();
    while let Some((pos, c)) = chars.next() {
        let token = match c {
            c if c.is_whitespace() => continue,
            '~' => Token::Tilde,
            '&' => Token::And,
            '|' => Token::Or,
            '(' => Token::Open,
            ')' => Token::Close,
            c if c.is_ascii_alphabetic() => {
                let mut end = pos + c.len_utf8();
                while let Some(&(next_pos, next)) = chars.peek() {
                    if next.is_ascii_alphanumeric() || next == '_' {
                        end = next_pos + next.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                Token::Name(&text[pos..end])
            }
            other => {
                return Err(CellError::UnexpectedToken {
                    found: other.to_string(),
                    position: pos,
                })
            }
        };
        tokens.push((pos, token));
    }
    Ok(tokens)
}

struct FormulaParser<'a> {
    tokens: Vec<(usize, Token<'a>)>,
    pos: usize,
    roster: &'a Roster,
}

impl<'a> FormulaParser<'a> {
    fn new(text: &'a str, roster: &'a Roster) -> Result<Self, CellError> {
        Ok(Self {
            tokens: tokenize(text)?,
            pos: 0,
            roster,
        })
    }

    fn parse(mut self) -> Result<Formula, CellError> {
        let formula = self.chain()?;
        match self.tokens.get(self.pos) {
            None => Ok(formula),
            Some((position, token)) => Err(CellError::UnexpectedToken {
                found: token.text(),
                position: *position,
            }),
        }
    }

    fn peek(&self) -> Option<Token<'a>> {
        self.tokens.get(self.pos).map(|(_, t)| *t)
    }

    fn chain(&mut self) -> Result<Formula, CellError> {
        let mut left = self.unary()?;
        loop {
            match self.peek() {
                Some(Token::And) => {
                    self.pos += 1;
                    left = left.and(self.unary()?);
                }
                Some(Token::Or) => {
                    self.pos += 1;
                    left = left.or(self.unary()?);
                }
                _ => return Ok(left),
            }
        }
    }

    fn unary(&mut self) -> Result<Formula, CellError> {
        if self.peek() == Some(Token::Tilde) {
            self.pos += 1;
            return Ok(self.unary()?.invert());
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Formula, CellError> {
        let Some(&(position, token)) = self.tokens.get(self.pos) else {
            return Err(CellError::UnexpectedEnd {
                expected: "an agent or '('",
            });
        };
        self.pos += 1;
        match token {
            Token::Name(name) => self
                .roster
                .lookup(name)
                .map(Formula::literal)
                .ok_or_else(|| CellError::UnknownAgent(name.to_string())),
            Token::Open => {
                let inner = self.chain()?;
                match self.tokens.get(self.pos) {
                    Some((_, Token::Close)) => {
                        self.pos += 1;
                        Ok(inner)
                    }
                    Some((position, token)) => Err(CellError::UnexpectedToken {
                        found: token.text(),
                        position: *position,
                    }),
                    None => Err(CellError::UnexpectedEnd { expected: "')'" }),
                }
            }
            other => Err(CellError::UnexpectedToken {
                found: other.text(),
                position,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AgentId;

    fn roster() -> Roster {
        Roster::with_default_names(4)
    }

    fn a(i: usize) -> AgentId {
        AgentId::new(i)
    }

    #[test]
    fn test_parse_terminal_and_blank() {
        let r = roster();
        assert_eq!(
            parse_cell("1", &r).unwrap(),
            DelegationExpression::DirectVote(Bit::One)
        );
        assert_eq!(
            parse_cell(" 0 ", &r).unwrap(),
            DelegationExpression::DirectVote(Bit::Zero)
        );
        assert_eq!(parse_cell("-", &r).unwrap(), DelegationExpression::Blank);
        assert_eq!(parse_cell("", &r).unwrap(), DelegationExpression::Blank);
    }

    #[test]
    fn test_parse_delegate() {
        let r = roster();
        assert_eq!(
            parse_cell("B", &r).unwrap(),
            DelegationExpression::Delegate {
                target: a(1),
                negated: false
            }
        );
        assert_eq!(
            parse_cell("~C", &r).unwrap(),
            DelegationExpression::Delegate {
                target: a(2),
                negated: true
            }
        );
        assert_eq!(
            parse_cell("~(~A)", &r).unwrap(),
            DelegationExpression::Delegate {
                target: a(0),
                negated: false
            }
        );
    }

    #[test]
    fn test_parse_majority() {
        let r = roster();
        assert_eq!(
            parse_cell("maj(A B D)", &r).unwrap(),
            DelegationExpression::Majority {
                participants: vec![a(0), a(1), a(3)]
            }
        );
    }

    #[test]
    fn test_parse_quota_and_rule() {
        let r = roster();
        assert_eq!(
            parse_cell("quota(2; A B C)", &r).unwrap(),
            DelegationExpression::Quota {
                participants: vec![a(0), a(1), a(2)],
                threshold: 2
            }
        );
        match parse_cell("rule(0.6; A B C D)", &r).unwrap() {
            DelegationExpression::VotingRule { fraction, .. } => {
                assert_eq!(fraction, Fraction::new(3, 5).unwrap());
            }
            other => panic!("unexpected {other:?}"),
        }
        match parse_cell("rule(2/3; A B C)", &r).unwrap() {
            DelegationExpression::VotingRule { fraction, .. } => {
                assert_eq!(fraction.to_string(), "2/3");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_formula_left_assoc() {
        let r = roster();
        let expected = Formula::literal(a(0))
            .and(Formula::negated(a(1)))
            .or(Formula::literal(a(2)));
        assert_eq!(
            parse_cell("A&~B|C", &r).unwrap(),
            DelegationExpression::Formula(expected)
        );
    }

    #[test]
    fn test_parse_sibling_groups() {
        let r = roster();
        let expected = Formula::literal(a(0))
            .or(Formula::literal(a(1)))
            .and(Formula::literal(a(2)).or(Formula::literal(a(3))));
        assert_eq!(
            parse_cell("(A|B)&(C|D)", &r).unwrap(),
            DelegationExpression::Formula(expected)
        );
    }

    #[test]
    fn test_parse_negated_group() {
        let r = roster();
        let expected = Formula::literal(a(0)).and(Formula::literal(a(1))).invert();
        assert_eq!(
            parse_cell("~(A & B)", &r).unwrap(),
            DelegationExpression::Formula(expected)
        );
    }

    #[test]
    fn test_render_roundtrip_preserves_structure() {
        let r = roster();
        for text in ["A&~B|C", "~A&(B|C)", "(A|B)&(C|D)", "~(A&B)|D", "quota(1; B C)"] {
            let expr = parse_cell(text, &r).unwrap();
            let rendered = expr.display(&r).to_string();
            assert_eq!(parse_cell(&rendered, &r).unwrap(), expr, "{text}");
        }
    }

    #[test]
    fn test_parse_errors() {
        let r = roster();
        assert_eq!(
            parse_cell("E", &r),
            Err(CellError::UnknownAgent("E".to_string()))
        );
        assert!(matches!(
            parse_cell("A&", &r),
            Err(CellError::UnexpectedEnd { .. })
        ));
        assert!(matches!(
            parse_cell("(A|B", &r),
            Err(CellError::UnexpectedEnd { .. })
        ));
        assert!(matches!(
            parse_cell("A B", &r),
            Err(CellError::UnexpectedToken { .. })
        ));
        assert!(matches!(
            parse_cell("A+B", &r),
            Err(CellError::UnexpectedToken { .. })
        ));
        assert_eq!(
            parse_cell("maj()", &r),
            Err(CellError::NoParticipants { form: "maj" })
        );
        assert!(matches!(
            parse_cell("quota(4; A B)", &r),
            Err(CellError::QuotaOutOfRange { .. })
        ));
        assert!(matches!(
            parse_cell("quota(A B)", &r),
            Err(CellError::UnexpectedEnd { .. })
        ));
        assert!(matches!(
            parse_cell("rule(1.5; A B)", &r),
            Err(CellError::InvalidFraction(_))
        ));
        assert!(matches!(
            parse_cell("rule(0; A B)", &r),
            Err(CellError::InvalidFraction(_))
        ));
    }

    #[test]
    fn test_parse_fraction_forms() {
        assert_eq!(parse_fraction("1").unwrap(), Fraction::new(1, 1).unwrap());
        assert_eq!(parse_fraction("0.5").unwrap(), Fraction::new(1, 2).unwrap());
        assert_eq!(parse_fraction("3/4").unwrap(), Fraction::new(3, 4).unwrap());
        assert!(parse_fraction("abc").is_err());
        assert!(parse_fraction("0.-1").is_err());
    }
}
