// Valet Engine — Rule Matcher
// Maps a normalized utterance to an intent classification. Deterministic and
// total: rules are evaluated as an ordered table and the first matching rule
// wins — no scoring, no backtracking. The bottom case is `Intent::Unknown`,
// which hands the utterance to the escalation chain.
//
// Ordering is part of the contract. Fixed-phrase containment rules (time,
// date) run before the structured regex rules, so e.g. "set a timer for ten
// minutes" resolves to `time` via containment, never to the timer rule.

use crate::atoms::constants::{
    whitelisted_app, whitelisted_site, BROWSER_CLOSE_SYNONYMS, KEY_SYNONYMS,
};
use crate::atoms::types::{
    BrightnessDirection, CustomCommand, CustomCommands, Intent, MediaAction, ScrollDirection,
    TimeUnit, VolumeDirection,
};
use regex::Regex;
use std::sync::LazyLock;

// ── Structured-extraction patterns ─────────────────────────────────────────

static RE_DOMAIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9.-]+\.[a-z]{2,}(/.*)?$").unwrap());
static RE_CLOSE_DETERMINER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(the|my)\s+").unwrap());
static RE_REMIND_IN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^remind me in (\d+) (second|seconds|minute|minutes|hour|hours) to (.+)$").unwrap()
});
static RE_REMIND_AT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^remind me at (\d{1,2}):(\d{2}) to (.+)$").unwrap());
static RE_CALC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(what is |what's )?([0-9\s+\-*/().]+)$").unwrap());
static RE_CONVERT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^convert\s+([\d.]+)\s*([a-z]+)\s+to\s+([a-z]+)").unwrap());
static RE_DATE_OF_WEEK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^what (day|day of week) is (\d{4}-\d{2}-\d{2})").unwrap());
static RE_MESSAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(send\s+)?message\s+(to\s+)?([a-z\s]+?)[,:]?\s+(.*)$").unwrap()
});
static RE_MESSAGE_NAME_ONLY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(send\s+)?(a\s+)?message\s+to\s+([a-z\s]+)$").unwrap());
static RE_EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:send\s+)?email\s+(?:to\s+)?([a-z\s]+?)(?:\s+(?:about|regarding|subject)\s+(.+)|[,:]\s*(.+))?$",
    )
    .unwrap()
});
static RE_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(call|dial)\s+([a-z\s]+)$").unwrap());
static RE_WEATHER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(what'?s\s+the\s+)?(weather|temperature)(\s+in\s+(.+))?").unwrap()
});
static RE_WIKI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(who is|what is|tell me about)\s+(.+)$").unwrap());
static RE_TIMER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(set\s+)?(a\s+)?timer\s+for\s+(\d+)\s+(second|seconds|minute|minutes|hour|hours)")
        .unwrap()
});
static RE_ALARM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(set\s+)?(an\s+)?alarm\s+(for|at)\s+(\d{1,2})(:(\d{2}))?\s*(am|pm)?").unwrap()
});
static RE_TRANSLATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^translate\s+(.+?)\s+to\s+([a-zA-Z\-]+)$").unwrap());
static RE_NEWS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(news|headlines)(\s+about\s+(.+))?$").unwrap());

// ── Dispatch ───────────────────────────────────────────────────────────────

/// One row of the rule table: lowered utterance + raw utterance in, intent
/// out on match. Each row is independently unit-testable.
type Rule = fn(c: &str, raw: &str) -> Option<Intent>;

/// The ordered rule table. First match wins.
const RULES: &[Rule] = &[
    rule_open,
    rule_close,
    rule_goto,
    rule_search,
    rule_youtube,
    rule_type,
    rule_press,
    rule_scroll,
    rule_screenshot,
    rule_time_date,
    rule_volume,
    rule_brightness,
    rule_media,
    rule_remind,
    rule_greet,
    rule_exit,
    rule_calc,
    rule_convert,
    rule_date_of_week,
    rule_read_full_answer,
    rule_protocols,
    rule_message,
    rule_email,
    rule_call,
    rule_weather,
    rule_wiki,
    rule_timer,
    rule_alarm,
    rule_translate,
    rule_news,
];

/// Classify one utterance. Custom commands are consulted first (verbatim
/// lowercase phrase), then the rule table in order, then `Unknown`.
pub fn match_intent(command: &str, custom: &CustomCommands) -> Intent {
    let raw = command.trim();
    let c = raw.to_lowercase();

    if let Some(entry) = custom.get(c.as_str()) {
        return custom_intent(entry, &c);
    }

    for rule in RULES {
        if let Some(intent) = rule(&c, raw) {
            return intent;
        }
    }

    Intent::Unknown(c)
}

/// Resolve a custom-command entry's pre-resolved (action, target) pair into
/// an intent. Unknown tags and missing required targets degrade to `Unknown`
/// so the escalation chain still gets a chance at the phrase.
fn custom_intent(entry: &CustomCommand, phrase: &str) -> Intent {
    let target = entry.target.clone().unwrap_or_default();
    match entry.action.as_str() {
        "open_app" if !target.is_empty() => Intent::OpenApp(target),
        "open_site" if !target.is_empty() => Intent::OpenSite(target),
        "open_url" if !target.is_empty() => Intent::OpenUrl(target),
        "open_browser" => Intent::OpenBrowser,
        "close_app" if !target.is_empty() => Intent::CloseApp(target),
        "close_browser" => Intent::CloseBrowser,
        "search_web" => Intent::SearchWeb(target),
        "search_youtube" => Intent::SearchYoutube(target),
        "time" => Intent::Time,
        "date" => Intent::Date,
        "greet" => Intent::Greet,
        "exit" => Intent::Exit,
        "calc" if !target.is_empty() => Intent::Calc(target),
        "wiki" if !target.is_empty() => Intent::Wiki(target),
        "weather" => Intent::Weather(target),
        "news" => Intent::News(target),
        "volume" => match VolumeDirection::parse(&target) {
            Some(d) => Intent::Volume(d),
            None => Intent::Unknown(phrase.to_string()),
        },
        "brightness" => match BrightnessDirection::parse(&target) {
            Some(d) => Intent::Brightness(d),
            None => Intent::Unknown(phrase.to_string()),
        },
        "media" => match MediaAction::parse(&target) {
            Some(a) => Intent::Media(a),
            None => Intent::Unknown(phrase.to_string()),
        },
        _ => Intent::Unknown(phrase.to_string()),
    }
}

// ── Verb-prefixed structural rules ─────────────────────────────────────────

fn rule_open(c: &str, _raw: &str) -> Option<Intent> {
    if c == "open" {
        return Some(Intent::PromptOpen);
    }
    let target = c.strip_prefix("open ")?.trim();

    // Explicit browser phrasing routes to a site rather than an app.
    const WEB_MARKERS: &[&str] = &[" in browser", " on browser", " web"];
    if WEB_MARKERS.iter().any(|m| target.contains(m)) {
        let mut site_hint = target.to_string();
        for marker in WEB_MARKERS {
            site_hint = site_hint.replace(marker, "");
        }
        let site_hint = site_hint.trim();
        if whitelisted_site(site_hint).is_some() {
            return Some(Intent::OpenSite(site_hint.to_string()));
        }
        if site_hint == "whatsapp" || site_hint == "whatsapp web" {
            return Some(Intent::OpenSite("whatsapp".into()));
        }
    }

    if whitelisted_app(target).is_some() {
        return Some(Intent::OpenApp(target.to_string()));
    }
    if whitelisted_site(target).is_some() {
        return Some(Intent::OpenSite(target.to_string()));
    }
    if target == "chrome" || target == "browser" {
        return Some(Intent::OpenBrowser);
    }
    // Bare URLs and plain domains are allowed; anything else needs a clarification.
    if target.starts_with("http://") || target.starts_with("https://") {
        return Some(Intent::OpenUrl(target.to_string()));
    }
    if RE_DOMAIN.is_match(target) {
        return Some(Intent::OpenUrl(format!("https://{target}")));
    }
    Some(Intent::UnknownOpen(target.to_string()))
}

fn rule_close(c: &str, _raw: &str) -> Option<Intent> {
    if c == "close browser" || c == "close the browser" {
        return Some(Intent::CloseBrowser);
    }
    let target = c.strip_prefix("close ")?.trim();
    let target = RE_CLOSE_DETERMINER.replace(target, "");
    let target = target.trim();
    if BROWSER_CLOSE_SYNONYMS.contains(&target) {
        return Some(Intent::CloseBrowser);
    }
    if whitelisted_app(target).is_some() {
        return Some(Intent::CloseApp(target.to_string()));
    }
    Some(Intent::UnknownClose(target.to_string()))
}

fn rule_goto(c: &str, _raw: &str) -> Option<Intent> {
    if !c.starts_with("go to ") && !c.starts_with("goto ") {
        return None;
    }
    let target = c.splitn(3, ' ').last().unwrap_or("").trim();
    if whitelisted_site(target).is_some() {
        return Some(Intent::OpenSite(target.to_string()));
    }
    if target.starts_with("http://") || target.starts_with("https://") {
        return Some(Intent::OpenUrl(target.to_string()));
    }
    if RE_DOMAIN.is_match(target) {
        return Some(Intent::OpenUrl(format!("https://{target}")));
    }
    Some(Intent::UnknownSite(target.to_string()))
}

fn rule_search(c: &str, _raw: &str) -> Option<Intent> {
    if c.starts_with("search ") || c.starts_with("google ") {
        let query = c.splitn(2, ' ').nth(1).unwrap_or("").trim();
        return Some(Intent::SearchWeb(query.to_string()));
    }
    None
}

fn rule_youtube(c: &str, _raw: &str) -> Option<Intent> {
    if c.starts_with("youtube ") || c.starts_with("search youtube ") {
        let q = c.splitn(2, ' ').nth(1).unwrap_or("").trim();
        return Some(Intent::SearchYoutube(q.to_string()));
    }
    None
}

fn rule_type(c: &str, raw: &str) -> Option<Intent> {
    if !c.starts_with("type ") {
        return None;
    }
    // The payload keeps the original casing of the dictated text.
    let trimmed = raw.trim();
    let payload = trimmed.get(5..).unwrap_or("").trim();
    if payload.is_empty() {
        return None;
    }
    Some(Intent::TypeText(payload.to_string()))
}

fn rule_press(c: &str, _raw: &str) -> Option<Intent> {
    let key = c.strip_prefix("press ")?.trim();
    let parts: Vec<String> = key
        .split(['+', '-'])
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| {
            KEY_SYNONYMS
                .iter()
                .find(|(k, _)| *k == p)
                .map(|(_, v)| v.to_string())
                .unwrap_or_else(|| p.to_string())
        })
        .collect();
    if parts.is_empty() {
        return None;
    }
    Some(Intent::PressKey(parts))
}

// ── Fixed-phrase membership rules ──────────────────────────────────────────

fn rule_scroll(c: &str, _raw: &str) -> Option<Intent> {
    if matches!(c, "scroll up" | "scroll down" | "scroll top" | "scroll bottom") {
        let direction = c.splitn(2, ' ').nth(1)?;
        return ScrollDirection::parse(direction).map(Intent::Scroll);
    }
    None
}

fn rule_screenshot(c: &str, _raw: &str) -> Option<Intent> {
    matches!(c, "screenshot" | "take screenshot" | "capture screen").then_some(Intent::Screenshot)
}

fn rule_time_date(c: &str, _raw: &str) -> Option<Intent> {
    if c.contains("time") {
        return Some(Intent::Time);
    }
    if c.contains("date") || c.contains("day") {
        return Some(Intent::Date);
    }
    None
}

fn rule_volume(c: &str, _raw: &str) -> Option<Intent> {
    match c {
        "volume up" | "increase volume" => Some(Intent::Volume(VolumeDirection::Up)),
        "volume down" | "decrease volume" => Some(Intent::Volume(VolumeDirection::Down)),
        "mute" | "unmute" | "toggle mute" => Some(Intent::Volume(VolumeDirection::Mute)),
        _ => None,
    }
}

fn rule_brightness(c: &str, _raw: &str) -> Option<Intent> {
    match c {
        "brightness up" | "increase brightness" => {
            Some(Intent::Brightness(BrightnessDirection::Up))
        }
        "brightness down" | "decrease brightness" => {
            Some(Intent::Brightness(BrightnessDirection::Down))
        }
        _ => None,
    }
}

fn rule_media(c: &str, _raw: &str) -> Option<Intent> {
    match c {
        "play" | "pause" | "play pause" | "resume" => Some(Intent::Media(MediaAction::PlayPause)),
        "next" | "next track" | "next song" => Some(Intent::Media(MediaAction::Next)),
        "previous" | "previous track" | "previous song" => {
            Some(Intent::Media(MediaAction::Previous))
        }
        _ => None,
    }
}

// ── Regex-structured extraction rules ──────────────────────────────────────

fn rule_remind(c: &str, _raw: &str) -> Option<Intent> {
    if let Some(m) = RE_REMIND_IN.captures(c) {
        let amount: u64 = m[1].parse().ok()?;
        let unit = TimeUnit::parse(&m[2])?;
        return Some(Intent::RemindIn { amount, unit, message: m[3].to_string() });
    }
    if let Some(m) = RE_REMIND_AT.captures(c) {
        let hour: u32 = m[1].parse().ok()?;
        let minute: u32 = m[2].parse().ok()?;
        return Some(Intent::RemindAt { hour, minute, message: m[3].to_string() });
    }
    None
}

fn rule_greet(c: &str, _raw: &str) -> Option<Intent> {
    matches!(c, "hello" | "hi" | "hey").then_some(Intent::Greet)
}

fn rule_exit(c: &str, _raw: &str) -> Option<Intent> {
    matches!(c, "stop" | "exit" | "quit" | "bye").then_some(Intent::Exit)
}

fn rule_calc(c: &str, _raw: &str) -> Option<Intent> {
    if let Some(expr) = c.strip_prefix("calculate ") {
        return Some(Intent::Calc(expr.trim().to_string()));
    }
    // Bare arithmetic, optionally led by "what is": the character class is
    // restricted before evaluation is even attempted downstream.
    if let Some(m) = RE_CALC.captures(c) {
        return Some(Intent::Calc(m[2].trim().to_string()));
    }
    None
}

fn rule_convert(c: &str, _raw: &str) -> Option<Intent> {
    let m = RE_CONVERT.captures(c)?;
    let value: f64 = m[1].parse().ok()?;
    Some(Intent::Convert { value, src: m[2].to_string(), dst: m[3].to_string() })
}

fn rule_date_of_week(c: &str, _raw: &str) -> Option<Intent> {
    RE_DATE_OF_WEEK.captures(c).map(|m| Intent::DateOfWeek(m[2].to_string()))
}

fn rule_read_full_answer(c: &str, _raw: &str) -> Option<Intent> {
    matches!(
        c,
        "read full answer" | "read the answer" | "read again" | "repeat answer"
            | "repeat the answer"
    )
    .then_some(Intent::ReadFullAnswer)
}

fn rule_protocols(c: &str, _raw: &str) -> Option<Intent> {
    match c {
        "engage stealth mode" | "stealth mode" | "enter stealth mode" => {
            Some(Intent::ProtocolStealth)
        }
        "house party protocol" | "initiate house party" | "start house party" => {
            Some(Intent::ProtocolHouseParty)
        }
        "clean slate protocol" | "initiate clean slate" | "clean slate" => {
            Some(Intent::ProtocolCleanSlate)
        }
        _ => None,
    }
}

fn rule_message(c: &str, _raw: &str) -> Option<Intent> {
    // With inline body: "message john i'm late", "send message to alice: meeting at 5"
    if let Some(m) = RE_MESSAGE.captures(c) {
        let name = m[3].trim().to_string();
        let body = m[4].trim().to_string();
        if !name.is_empty() && !body.is_empty() {
            return Some(Intent::Message { name, body });
        }
    }
    // Name only: "send a message to alice"
    if let Some(m) = RE_MESSAGE_NAME_ONLY.captures(c) {
        let name = m[3].trim().to_string();
        return Some(Intent::Message { name, body: String::new() });
    }
    None
}

fn rule_email(c: &str, _raw: &str) -> Option<Intent> {
    // Body is introduced by "about"/"regarding"/"subject" or a comma/colon;
    // a bare "email {name}" composes with an empty body.
    let m = RE_EMAIL.captures(c)?;
    let name = m[1].trim().to_string();
    let body = m
        .get(2)
        .or_else(|| m.get(3))
        .map(|g| g.as_str().trim().to_string())
        .unwrap_or_default();
    Some(Intent::Email { name, body })
}

fn rule_call(c: &str, _raw: &str) -> Option<Intent> {
    RE_CALL.captures(c).map(|m| Intent::Call(m[2].trim().to_string()))
}

fn rule_weather(c: &str, _raw: &str) -> Option<Intent> {
    let m = RE_WEATHER.captures(c)?;
    let loc = m.get(4).map(|g| g.as_str().trim().to_string()).unwrap_or_default();
    Some(Intent::Weather(loc))
}

fn rule_wiki(c: &str, _raw: &str) -> Option<Intent> {
    RE_WIKI.captures(c).map(|m| Intent::Wiki(m[2].trim().to_string()))
}

fn rule_timer(c: &str, _raw: &str) -> Option<Intent> {
    let m = RE_TIMER.captures(c)?;
    let amount: u64 = m[3].parse().ok()?;
    let unit = TimeUnit::parse(&m[4])?;
    Some(Intent::RemindIn { amount, unit, message: "Timer finished".into() })
}

fn rule_alarm(c: &str, _raw: &str) -> Option<Intent> {
    let m = RE_ALARM.captures(c)?;
    let mut hour: u32 = m[4].parse().ok()?;
    let minute: u32 = m.get(6).and_then(|g| g.as_str().parse().ok()).unwrap_or(0);
    let meridiem = m.get(7).map(|g| g.as_str()).unwrap_or("");
    // 12-hour normalization: 12 AM → 0, 12 PM stays 12, other PM hours +12.
    if meridiem == "pm" && hour < 12 {
        hour += 12;
    }
    if meridiem == "am" && hour == 12 {
        hour = 0;
    }
    Some(Intent::RemindAt { hour, minute, message: "Alarm".into() })
}

fn rule_translate(c: &str, _raw: &str) -> Option<Intent> {
    RE_TRANSLATE.captures(c).map(|m| Intent::Translate {
        text: m[1].trim().to_string(),
        lang: m[2].trim().to_string(),
    })
}

fn rule_news(c: &str, _raw: &str) -> Option<Intent> {
    let m = RE_NEWS.captures(c)?;
    let topic = m.get(3).map(|g| g.as_str().trim().to_string()).unwrap_or_default();
    Some(Intent::News(topic))
}

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════
