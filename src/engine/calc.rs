// Valet Engine — Calculator & Unit Conversion
// A small recursive-descent evaluator for the restricted arithmetic
// character set (digits, + - * / ( ) .), and the fixed unit-pair table.
// Expressions are charset-checked before evaluation is even attempted;
// anything outside the class is refused, not evaluated.

use regex::Regex;
use std::sync::LazyLock;

static RE_SAFE_EXPR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9\s+\-*/().]+$").unwrap());

/// True if the expression contains only the allowed arithmetic characters.
pub fn is_safe_expr(expr: &str) -> bool {
    RE_SAFE_EXPR.is_match(expr)
}

/// Evaluate a restricted arithmetic expression. Returns `None` on syntax
/// errors, division by zero, or any character outside the allowed set.
pub fn eval_expr(expr: &str) -> Option<f64> {
    if !is_safe_expr(expr) {
        return None;
    }
    let chars: Vec<char> = expr.chars().filter(|ch| !ch.is_whitespace()).collect();
    let mut parser = Parser { chars, pos: 0 };
    let value = parser.expression()?;
    if parser.pos != parser.chars.len() {
        return None; // trailing garbage
    }
    value.is_finite().then_some(value)
}

/// Pratt-free grammar: expression → term (('+'|'-') term)*
///                     term       → factor (('*'|'/') factor)*
///                     factor     → ('+'|'-')* (number | '(' expression ')')
struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        Some(ch)
    }

    fn expression(&mut self) -> Option<f64> {
        let mut acc = self.term()?;
        while let Some(op) = self.peek() {
            match op {
                '+' => {
                    self.bump();
                    acc += self.term()?;
                }
                '-' => {
                    self.bump();
                    acc -= self.term()?;
                }
                _ => break,
            }
        }
        Some(acc)
    }

    fn term(&mut self) -> Option<f64> {
        let mut acc = self.factor()?;
        while let Some(op) = self.peek() {
            match op {
                '*' => {
                    self.bump();
                    acc *= self.factor()?;
                }
                '/' => {
                    self.bump();
                    let rhs = self.factor()?;
                    acc /= rhs;
                }
                _ => break,
            }
        }
        Some(acc)
    }

    fn factor(&mut self) -> Option<f64> {
        let mut negative = false;
        while let Some(sign) = self.peek() {
            match sign {
                '+' => {
                    self.bump();
                }
                '-' => {
                    self.bump();
                    negative = !negative;
                }
                _ => break,
            }
        }
        let value = match self.peek()? {
            '(' => {
                self.bump();
                let inner = self.expression()?;
                if self.bump()? != ')' {
                    return None;
                }
                inner
            }
            ch if ch.is_ascii_digit() || ch == '.' => self.number()?,
            _ => return None,
        };
        Some(if negative { -value } else { value })
    }

    fn number(&mut self) -> Option<f64> {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() || ch == '.' {
                self.pos += 1;
            } else {
                break;
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        text.parse().ok()
    }
}

// ── Unit conversion ────────────────────────────────────────────────────────

/// Convert between the explicitly supported unit pairs: temperature C/F,
/// length inch/cm and meter/foot, weight kg/lb. Unsupported pairs return
/// `None` — "unsupported", not an error.
pub fn convert_units(value: f64, src: &str, dst: &str) -> Option<f64> {
    let src = src.to_lowercase();
    let dst = dst.to_lowercase();
    let src = src.as_str();
    let dst = dst.as_str();

    const CELSIUS: &[&str] = &["c", "celsius"];
    const FAHRENHEIT: &[&str] = &["f", "fahrenheit"];
    const INCHES: &[&str] = &["inch", "in", "inches"];
    const CENTIMETERS: &[&str] = &["cm", "centimeter", "centimeters"];
    const METERS: &[&str] = &["m", "meter", "meters"];
    const FEET: &[&str] = &["ft", "foot", "feet"];
    const KILOGRAMS: &[&str] = &["kg", "kilogram", "kilograms"];
    const POUNDS: &[&str] = &["lb", "lbs", "pound", "pounds"];

    let is = |set: &[&str], unit: &str| set.contains(&unit);

    // temperature
    if is(CELSIUS, src) && is(FAHRENHEIT, dst) {
        return Some(value * 9.0 / 5.0 + 32.0);
    }
    if is(FAHRENHEIT, src) && is(CELSIUS, dst) {
        return Some((value - 32.0) * 5.0 / 9.0);
    }
    // length
    if is(INCHES, src) && is(CENTIMETERS, dst) {
        return Some(value * 2.54);
    }
    if is(CENTIMETERS, src) && is(INCHES, dst) {
        return Some(value / 2.54);
    }
    if is(METERS, src) && is(FEET, dst) {
        return Some(value * 3.28084);
    }
    if is(FEET, src) && is(METERS, dst) {
        return Some(value / 3.28084);
    }
    // weight
    if is(KILOGRAMS, src) && is(POUNDS, dst) {
        return Some(value * 2.20462);
    }
    if is(POUNDS, src) && is(KILOGRAMS, dst) {
        return Some(value / 2.20462);
    }

    None
}

/// Round to 4 decimal places for speech, matching the conversion output
/// the assistant reads back.
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
