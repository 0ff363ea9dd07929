// Valet Engine — AI Intent Router
// Sends a rule-unknown utterance plus the fixed intent taxonomy to the
// language-model capability and validates the structured reply locally.
// The model is never trusted: anything absent, out of whitelist, or with a
// malformed argument shape is a "no match" — never an error, never a retry.

use crate::atoms::traits::LanguageModel;
use crate::atoms::types::{
    BrightnessDirection, Intent, MediaAction, TimeUnit, VolumeDirection,
};
use crate::engine::calc::is_safe_expr;
use log::info;
use serde_json::Value;

/// Taxonomy revision sent with every request. Bump when the intent list or
/// an argument shape changes.
pub const TAXONOMY_VERSION: &str = "1";

/// The fixed routing instruction: intent list + required argument shapes.
/// The reply must be a single strict-JSON object `{intent, args}`.
const ROUTER_INSTRUCTION: &str = "\
You are a command router. Map the user's sentence to one of these intents: \
open_app, open_site, open_browser, search_web, search_youtube, time, date, greet, exit, \
volume, brightness, media, remind_in, remind_at, calc, convert, date_of_week, read_full_answer. \
Only choose intents that are obviously implied. If unsure, return intent 'none'.\n\n\
Return STRICT JSON with keys: intent, args. Where args depends on intent:\n\
- open_app: {target} (e.g., 'notepad', 'calculator', 'paint', 'vscode', 'explorer')\n\
- open_site: {target} (e.g., 'google', 'youtube', 'github', 'gmail')\n\
- open_browser: {}\n\
- search_web: {query}\n\
- search_youtube: {query}\n\
- time/date/greet/exit/read_full_answer: {}\n\
- volume: {direction} where direction in ['up','down','mute']\n\
- brightness: {direction} where direction in ['up','down']\n\
- media: {action} where action in ['play_pause','next','previous']\n\
- remind_in: {amount, unit, message} with unit in ['seconds','minutes','hours']\n\
- remind_at: {hour, minute, message} 24h integers\n\
- calc: {expr} using only digits +-*/().\n\
- convert: {value, src, dst} like 10, 'cm', 'inch'\n\
- date_of_week: {date} in YYYY-MM-DD.\n\
Respond with ONLY the JSON, no extra text.";

/// Classify an utterance through the model. Any model failure, parse
/// failure, or schema violation is `None`; escalation proceeds.
pub async fn route(model: &dyn LanguageModel, text: &str) -> Option<Intent> {
    if text.is_empty() {
        return None;
    }
    let prompt = format!("{ROUTER_INSTRUCTION}\nUser: {text}");
    match model.generate(&prompt).await {
        Ok(raw) => {
            let intent = parse_response(&raw);
            if intent.is_none() {
                info!("[router] model reply rejected (taxonomy v{TAXONOMY_VERSION})");
            }
            intent
        }
        Err(e) => {
            info!("[router] model call failed, treating as no match: {e}");
            None
        }
    }
}

/// Parse and validate a raw model reply. Public so the validation table is
/// testable without a live model.
pub fn parse_response(raw: &str) -> Option<Intent> {
    let raw = strip_code_fences(raw.trim());
    let data: Value = serde_json::from_str(raw).ok()?;
    let intent = data.get("intent")?.as_str()?.trim();
    if intent.is_empty() || intent.eq_ignore_ascii_case("none") {
        return None;
    }
    let args = data.get("args").cloned().unwrap_or(Value::Null);
    validate(intent, &args)
}

/// Some model SDKs wrap JSON in markdown code fences; strip them.
fn strip_code_fences(raw: &str) -> &str {
    if let Some(body) = raw.strip_prefix("```json").and_then(|r| r.strip_suffix("```")) {
        return body.trim();
    }
    if let Some(body) = raw.strip_prefix("```").and_then(|r| r.strip_suffix("```")) {
        return body.trim();
    }
    raw
}

// ── Per-intent argument validation ─────────────────────────────────────────

fn validate(intent: &str, args: &Value) -> Option<Intent> {
    match intent {
        "open_app" => Some(Intent::OpenApp(get_str(args, "target")?.to_lowercase())),
        "open_site" => Some(Intent::OpenSite(get_str(args, "target")?.to_lowercase())),
        "open_browser" => Some(Intent::OpenBrowser),
        "search_web" => Some(Intent::SearchWeb(get_str(args, "query").unwrap_or_default())),
        "search_youtube" => Some(Intent::SearchYoutube(get_str(args, "query").unwrap_or_default())),
        "time" => Some(Intent::Time),
        "date" => Some(Intent::Date),
        "greet" => Some(Intent::Greet),
        "exit" => Some(Intent::Exit),
        "read_full_answer" => Some(Intent::ReadFullAnswer),
        "volume" => {
            let direction = VolumeDirection::parse(&get_str(args, "direction")?)?;
            Some(Intent::Volume(direction))
        }
        "brightness" => {
            let direction = BrightnessDirection::parse(&get_str(args, "direction")?)?;
            Some(Intent::Brightness(direction))
        }
        "media" => {
            let action = MediaAction::parse(&get_str(args, "action")?)?;
            Some(Intent::Media(action))
        }
        "remind_in" => {
            let amount = get_i64(args, "amount")?;
            let unit = TimeUnit::parse(&get_str(args, "unit")?.to_lowercase())?;
            let message = get_str(args, "message")?;
            if amount > 0 && !message.is_empty() {
                Some(Intent::RemindIn { amount: amount as u64, unit, message })
            } else {
                None
            }
        }
        "remind_at" => {
            let hour = get_i64(args, "hour")?;
            let minute = get_i64(args, "minute")?;
            let message = get_str(args, "message")?;
            if (0..=23).contains(&hour) && (0..=59).contains(&minute) && !message.is_empty() {
                Some(Intent::RemindAt { hour: hour as u32, minute: minute as u32, message })
            } else {
                None
            }
        }
        "calc" => {
            let expr = get_str(args, "expr")?;
            is_safe_expr(&expr).then(|| Intent::Calc(expr))
        }
        "convert" => {
            let value = get_f64(args, "value")?;
            let src = get_str(args, "src")?.to_lowercase();
            let dst = get_str(args, "dst")?.to_lowercase();
            if src.is_empty() || dst.is_empty() {
                return None;
            }
            Some(Intent::Convert { value, src, dst })
        }
        "date_of_week" => {
            let date = get_str(args, "date")?;
            chrono::NaiveDate::parse_from_str(&date, "%Y-%m-%d").ok()?;
            Some(Intent::DateOfWeek(date))
        }
        // Outside the whitelist.
        _ => None,
    }
}

// Models return numbers as numbers or strings depending on mood; coerce.

fn get_str(args: &Value, key: &str) -> Option<String> {
    args.get(key)?.as_str().map(|s| s.trim().to_string())
}

fn get_i64(args: &Value, key: &str) -> Option<i64> {
    let v = args.get(key)?;
    v.as_i64().or_else(|| v.as_str()?.trim().parse().ok())
}

fn get_f64(args: &Value, key: &str) -> Option<f64> {
    let v = args.get(key)?;
    v.as_f64().or_else(|| v.as_str()?.trim().parse().ok())
}

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_simple_intents() {
        assert_eq!(
            parse_response(r#"{"intent":"open_app","args":{"target":"Notepad"}}"#),
            Some(Intent::OpenApp("notepad".into()))
        );
        assert_eq!(parse_response(r#"{"intent":"time","args":{}}"#), Some(Intent::Time));
        assert_eq!(
            parse_response(r#"{"intent":"volume","args":{"direction":"mute"}}"#),
            Some(Intent::Volume(VolumeDirection::Mute))
        );
    }

    #[test]
    fn test_code_fence_stripping() {
        let fenced = "```json\n{\"intent\":\"greet\",\"args\":{}}\n```";
        assert_eq!(parse_response(fenced), Some(Intent::Greet));
        let bare_fence = "```\n{\"intent\":\"exit\",\"args\":{}}\n```";
        assert_eq!(parse_response(bare_fence), Some(Intent::Exit));
    }

    #[test]
    fn test_rejects_none_and_missing_intent() {
        assert_eq!(parse_response(r#"{"intent":"none","args":{}}"#), None);
        assert_eq!(parse_response(r#"{"intent":"","args":{}}"#), None);
        assert_eq!(parse_response(r#"{"args":{}}"#), None);
        assert_eq!(parse_response("not json at all"), None);
    }

    #[test]
    fn test_rejects_out_of_whitelist_intent() {
        assert_eq!(parse_response(r#"{"intent":"format_disk","args":{}}"#), None);
        // "weather" is a real intent tag but not a routable one.
        assert_eq!(parse_response(r#"{"intent":"weather","args":{}}"#), None);
    }

    #[test]
    fn test_rejects_bad_direction() {
        assert_eq!(
            parse_response(r#"{"intent":"volume","args":{"direction":"sideways"}}"#),
            None
        );
        assert_eq!(
            parse_response(r#"{"intent":"brightness","args":{"direction":"mute"}}"#),
            None
        );
        assert_eq!(parse_response(r#"{"intent":"media","args":{"action":"rewind"}}"#), None);
    }

    #[test]
    fn test_remind_in_validation() {
        assert_eq!(
            parse_response(
                r#"{"intent":"remind_in","args":{"amount":10,"unit":"minutes","message":"stretch"}}"#
            ),
            Some(Intent::RemindIn { amount: 10, unit: TimeUnit::Minutes, message: "stretch".into() })
        );
        // Coerced from a string amount.
        assert_eq!(
            parse_response(
                r#"{"intent":"remind_in","args":{"amount":"5","unit":"seconds","message":"tea"}}"#
            ),
            Some(Intent::RemindIn { amount: 5, unit: TimeUnit::Seconds, message: "tea".into() })
        );
        // Zero amount, bad unit, empty message all rejected.
        assert_eq!(
            parse_response(
                r#"{"intent":"remind_in","args":{"amount":0,"unit":"minutes","message":"x"}}"#
            ),
            None
        );
        assert_eq!(
            parse_response(
                r#"{"intent":"remind_in","args":{"amount":3,"unit":"moons","message":"x"}}"#
            ),
            None
        );
        assert_eq!(
            parse_response(
                r#"{"intent":"remind_in","args":{"amount":3,"unit":"minutes","message":""}}"#
            ),
            None
        );
    }

    #[test]
    fn test_remind_at_validation() {
        assert_eq!(
            parse_response(
                r#"{"intent":"remind_at","args":{"hour":18,"minute":30,"message":"leave"}}"#
            ),
            Some(Intent::RemindAt { hour: 18, minute: 30, message: "leave".into() })
        );
        assert_eq!(
            parse_response(
                r#"{"intent":"remind_at","args":{"hour":24,"minute":0,"message":"x"}}"#
            ),
            None
        );
        assert_eq!(
            parse_response(
                r#"{"intent":"remind_at","args":{"hour":10,"minute":60,"message":"x"}}"#
            ),
            None
        );
    }

    #[test]
    fn test_calc_charset_enforced() {
        assert_eq!(
            parse_response(r#"{"intent":"calc","args":{"expr":"2+2"}}"#),
            Some(Intent::Calc("2+2".into()))
        );
        assert_eq!(
            parse_response(r#"{"intent":"calc","args":{"expr":"__import__('os')"}}"#),
            None
        );
    }

    #[test]
    fn test_convert_and_date_of_week_validation() {
        assert_eq!(
            parse_response(r#"{"intent":"convert","args":{"value":"10","src":"CM","dst":"inch"}}"#),
            Some(Intent::Convert { value: 10.0, src: "cm".into(), dst: "inch".into() })
        );
        assert_eq!(
            parse_response(r#"{"intent":"convert","args":{"value":"ten","src":"cm","dst":"inch"}}"#),
            None
        );
        assert_eq!(
            parse_response(r#"{"intent":"date_of_week","args":{"date":"2025-10-01"}}"#),
            Some(Intent::DateOfWeek("2025-10-01".into()))
        );
        assert_eq!(
            parse_response(r#"{"intent":"date_of_week","args":{"date":"10/01/2025"}}"#),
            None
        );
    }
}
