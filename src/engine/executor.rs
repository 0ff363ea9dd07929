// Valet Engine — Intent Executor
// Turns a resolved classification into effects. Everything that touches the
// OS or the network goes through a capability trait; this module only
// decides which capability to call and what to say about the outcome.
// Action failures always produce a short spoken failure message specific to
// the action; they never abort the loop.

use crate::atoms::constants::{whitelisted_app, whitelisted_site, WHITELISTED_APPS};
use crate::atoms::traits::{LanguageModel, SpeechOutput, SystemActions, WebBrowser};
use crate::atoms::types::{AssistantConfig, ContactBook, Intent};
use crate::engine::answer::{ai_answer, search_url, speak_full_answer};
use crate::engine::calc::{convert_units, eval_expr, is_safe_expr, round4};
use crate::engine::reminders::ReminderScheduler;
use chrono::{Duration, Local, NaiveDate, Timelike};
use log::info;
use std::sync::Arc;

pub struct Executor {
    speech: Arc<dyn SpeechOutput>,
    browser: Arc<dyn WebBrowser>,
    system: Arc<dyn SystemActions>,
    model: Arc<dyn LanguageModel>,
    scheduler: Arc<ReminderScheduler>,
    contacts: ContactBook,
    config: AssistantConfig,
}

impl Executor {
    pub fn new(
        speech: Arc<dyn SpeechOutput>,
        browser: Arc<dyn WebBrowser>,
        system: Arc<dyn SystemActions>,
        model: Arc<dyn LanguageModel>,
        scheduler: Arc<ReminderScheduler>,
        contacts: ContactBook,
        config: AssistantConfig,
    ) -> Self {
        Executor { speech, browser, system, model, scheduler, contacts, config }
    }

    async fn say(&self, text: &str) {
        let _ = self.speech.say(text).await;
    }

    /// Execute one intent. Returns `false` only when the assistant should
    /// shut down (the exit intent); every other outcome continues the loop.
    pub async fn execute(&self, intent: Intent, last_answer: &str) -> bool {
        info!("[executor] executing intent '{}'", intent.tag());
        match intent {
            Intent::OpenApp(app) => {
                let launched = match whitelisted_app(&app) {
                    Some(target) => self.system.launch_app(target).await.is_ok(),
                    None => false,
                };
                if launched {
                    self.say(&format!("Opening {app}")).await;
                } else {
                    self.say(&format!("I couldn't open {app}")).await;
                }
            }

            Intent::OpenBrowser => {
                if self.browser.open("https://www.google.com").await.is_ok() {
                    self.say("Opening browser").await;
                } else {
                    self.say("I couldn't open the browser").await;
                }
            }

            Intent::OpenSite(site) => match whitelisted_site(&site) {
                Some(url) => {
                    if self.browser.open(url).await.is_ok() {
                        self.say(&format!("Opening {site}")).await;
                    } else {
                        self.say(&format!("I couldn't open {site}")).await;
                    }
                }
                None => self.say(&format!("Site {site} is not allowed")).await,
            },

            Intent::PromptOpen => self.say("What should I open?").await,

            Intent::OpenUrl(url) => {
                // Final safety: only http(s) schemes leave the process.
                if url.starts_with("http://") || url.starts_with("https://") {
                    if self.browser.open(&url).await.is_ok() {
                        self.say("Opening site").await;
                    } else {
                        self.say("I couldn't open that site").await;
                    }
                } else {
                    self.say("Invalid URL").await;
                }
            }

            Intent::CloseBrowser => {
                if self.system.close_browser().await.is_ok() {
                    self.say("Closed browser").await;
                } else {
                    self.say("I couldn't close the browser").await;
                }
            }

            Intent::CloseApp(app) => {
                if app == "explorer" {
                    self.say("Closing File Explorer is not supported for safety").await;
                } else if self.system.close_app(&app).await.is_ok() {
                    self.say(&format!("Closed {app}")).await;
                } else {
                    self.say(&format!("I couldn't close {app}")).await;
                }
            }

            Intent::UnknownOpen(target) => {
                if target.is_empty() {
                    self.say("What should I open?").await;
                } else {
                    self.say(&format!("I can't open {target} yet. Say a known app or website."))
                        .await;
                }
            }

            Intent::UnknownClose(target) => {
                if target.is_empty() {
                    self.say("What should I close?").await;
                } else {
                    self.say(&format!("I can't close {target} yet. Say a known app.")).await;
                }
            }

            Intent::SearchWeb(query) => {
                if query.is_empty() {
                    self.say("What should I search for?").await;
                } else {
                    let _ = self.browser.open(&search_url(&query)).await;
                    self.say(&format!("Searching Google for {query}")).await;
                }
            }

            Intent::SearchYoutube(query) => {
                if query.is_empty() {
                    let _ = self.browser.open("https://www.youtube.com").await;
                    self.say("Opening YouTube").await;
                } else {
                    let url = format!(
                        "https://www.youtube.com/results?search_query={}",
                        query.replace(' ', "+")
                    );
                    let _ = self.browser.open(&url).await;
                    self.say(&format!("Searching YouTube for {query}")).await;
                }
            }

            Intent::Time => {
                let now = Local::now().format("%I:%M %p");
                self.say(&format!("It's {now}")).await;
            }

            Intent::Date => {
                let today = Local::now().format("%A, %B %d, %Y");
                self.say(&format!("Today is {today}")).await;
            }

            Intent::Greet => self.say("Hello, how can I help?").await,

            Intent::Exit => {
                self.say("Goodbye").await;
                return false;
            }

            Intent::Volume(direction) => {
                if self.system.volume(direction).await.is_ok() {
                    self.say("Done").await;
                } else {
                    self.say("Volume control not available").await;
                }
            }

            Intent::Brightness(direction) => {
                if self.system.brightness(direction).await.is_ok() {
                    self.say("Done").await;
                } else {
                    self.say("Brightness control not available").await;
                }
            }

            Intent::Media(action) => {
                if self.system.media(action).await.is_ok() {
                    self.say("Done").await;
                } else {
                    self.say("Media control not available").await;
                }
            }

            Intent::RemindIn { amount, unit, message } => {
                let when = Local::now() + Duration::seconds((amount * unit.secs()) as i64);
                self.scheduler.schedule(when, message);
                self.say(&format!("Reminder set in {amount} {}", unit.as_str())).await;
            }

            Intent::RemindAt { hour, minute, message } => {
                match reminder_clock_time(hour, minute) {
                    Some(when) => {
                        self.scheduler.schedule(when, message);
                        self.say(&format!("Reminder set for {hour:02}:{minute:02}")).await;
                    }
                    None => self.say("I couldn't set that reminder").await,
                }
            }

            Intent::Calc(expr) => {
                if !is_safe_expr(&expr) {
                    self.say("I can only calculate basic arithmetic").await;
                } else {
                    match eval_expr(&expr) {
                        Some(value) => {
                            self.say(&format!("The result is {}", format_number(value))).await
                        }
                        None => self.say("I couldn't compute that").await,
                    }
                }
            }

            Intent::Convert { value, src, dst } => match convert_units(value, &src, &dst) {
                Some(converted) => {
                    self.say(&format!("{value} {src} is {} {dst}", format_number(round4(converted))))
                        .await
                }
                None => self.say("I don't support that conversion yet").await,
            },

            Intent::DateOfWeek(date) => {
                match NaiveDate::parse_from_str(&date, "%Y-%m-%d") {
                    Ok(d) => self.say(&format!("That is a {}", d.format("%A"))).await,
                    Err(_) => self.say("Invalid date format. Use YYYY-MM-DD").await,
                }
            }

            Intent::ReadFullAnswer => {
                speak_full_answer(&*self.speech, &self.config, last_answer).await;
            }

            Intent::ProtocolStealth => {
                let _ = self.system.volume(crate::atoms::types::VolumeDirection::Mute).await;
                let _ = self
                    .system
                    .brightness(crate::atoms::types::BrightnessDirection::Down)
                    .await;
                self.say("Stealth mode engaged").await;
            }

            Intent::ProtocolHouseParty => {
                let _ =
                    self.system.brightness(crate::atoms::types::BrightnessDirection::Up).await;
                let _ = self.system.media(crate::atoms::types::MediaAction::PlayPause).await;
                self.say("House Party Protocol activated").await;
            }

            Intent::ProtocolCleanSlate => {
                for (app, _) in WHITELISTED_APPS {
                    if *app == "explorer" {
                        continue;
                    }
                    let _ = self.system.close_app(app).await;
                }
                let _ = self.system.volume(crate::atoms::types::VolumeDirection::Mute).await;
                self.scheduler.store().replace(&[]);
                self.say("Clean Slate completed").await;
            }

            Intent::TypeText(text) => {
                if self.system.type_text(&text).await.is_ok() {
                    self.say("Typed").await;
                } else {
                    self.say("I couldn't type").await;
                }
            }

            Intent::PressKey(keys) => {
                if self.system.press_keys(&keys).await.is_ok() {
                    self.say("Done").await;
                } else {
                    self.say("I couldn't press that").await;
                }
            }

            Intent::Scroll(direction) => {
                if self.system.scroll(direction).await.is_ok() {
                    self.say("Scrolled").await;
                } else {
                    self.say("I couldn't scroll").await;
                }
            }

            Intent::Screenshot => {
                if self.system.screenshot().await.is_ok() {
                    self.say("Captured screenshot").await;
                } else {
                    self.say("I couldn't take a screenshot").await;
                }
            }

            Intent::Weather(location) => {
                let url = if location.is_empty() {
                    "https://www.google.com/search?q=weather".to_string()
                } else {
                    format!("https://www.google.com/search?q=weather+{}", urlencoding::encode(&location))
                };
                if self.browser.open(&url).await.is_ok() {
                    self.say("Opening weather").await;
                } else {
                    self.say("I couldn't get the weather").await;
                }
            }

            Intent::Wiki(topic) => {
                let url = format!("https://en.wikipedia.org/wiki/{}", urlencoding::encode(&topic));
                if self.browser.open(&url).await.is_ok() {
                    self.say(&format!("Opening Wikipedia for {topic}")).await;
                } else {
                    self.say("I couldn't look that up").await;
                }
            }

            Intent::Translate { text, lang } => {
                let prompt = format!(
                    "Translate the following text into {lang}. Only return the translation.\n\nText: {text}"
                );
                let answer = ai_answer(&*self.model, &prompt).await;
                if !answer.is_empty() {
                    let snippet: String = answer.chars().take(500).collect();
                    self.say(&snippet).await;
                } else {
                    let url = format!(
                        "https://translate.google.com/?sl=auto&tl={}&text={}&op=translate",
                        urlencoding::encode(&lang),
                        urlencoding::encode(&text)
                    );
                    if self.browser.open(&url).await.is_ok() {
                        self.say(&format!("Opening translation to {lang}")).await;
                    } else {
                        self.say("I couldn't translate that").await;
                    }
                }
            }

            Intent::News(topic) => {
                let url = if topic.is_empty() {
                    "https://news.google.com".to_string()
                } else {
                    format!("https://news.google.com/search?q={}", urlencoding::encode(&topic))
                };
                if self.browser.open(&url).await.is_ok() {
                    self.say("Opening the news").await;
                } else {
                    self.say("I couldn't get the news").await;
                }
            }

            Intent::Message { name, body } => {
                let key = name.to_lowercase();
                match self.contacts.get(key.trim()) {
                    Some(info) => {
                        let phone = info
                            .phone
                            .as_deref()
                            .or(info.whatsapp.as_deref())
                            .map(|p| p.replace(' ', ""));
                        match phone {
                            Some(phone) if !phone.is_empty() => {
                                let url = format!(
                                    "https://wa.me/{phone}?text={}",
                                    urlencoding::encode(&body)
                                );
                                if self.browser.open(&url).await.is_ok() {
                                    self.say(&format!("Opening WhatsApp chat with {name}")).await;
                                } else {
                                    self.say("Failed to compose message").await;
                                }
                            }
                            _ => {
                                self.say(&format!("{name} has no WhatsApp number saved")).await;
                            }
                        }
                    }
                    None => self.say(&format!("I don't have contact info for {name}")).await,
                }
            }

            Intent::Email { name, body } => {
                let key = name.to_lowercase();
                let email = self.contacts.get(key.trim()).and_then(|c| c.email.clone());
                match email {
                    Some(email) => {
                        let url =
                            format!("mailto:{email}?subject=&body={}", urlencoding::encode(&body));
                        if self.browser.open(&url).await.is_ok() {
                            self.say(&format!("Opening email to {name}")).await;
                        } else {
                            self.say("Failed to compose email").await;
                        }
                    }
                    None => self.say(&format!("I don't have an email for {name}")).await,
                }
            }

            Intent::Call(name) => {
                let key = name.to_lowercase();
                let phone = self
                    .contacts
                    .get(key.trim())
                    .and_then(|c| c.phone.clone())
                    .map(|p| p.replace(' ', ""));
                match phone {
                    Some(number) if !number.is_empty() => {
                        if self.browser.open(&format!("tel:{number}")).await.is_ok() {
                            self.say(&format!("Trying to call {name}")).await;
                        } else {
                            self.say("Failed to start call").await;
                        }
                    }
                    _ => self.say(&format!("I don't have a phone number for {name}")).await,
                }
            }

            Intent::UnknownSite(_) | Intent::Unknown(_) => {
                self.say("I didn't understand that command").await;
            }
        }

        true
    }
}

/// Next occurrence of a wall-clock time: today if still ahead, otherwise
/// tomorrow. `None` for out-of-range clock values.
fn reminder_clock_time(hour: u32, minute: u32) -> Option<chrono::DateTime<Local>> {
    let now = Local::now();
    let mut when = now.with_hour(hour)?.with_minute(minute)?.with_second(0)?.with_nanosecond(0)?;
    if when < now {
        when += Duration::days(1);
    }
    Some(when)
}

/// Speak integers as integers: 4, not 4.0.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════
