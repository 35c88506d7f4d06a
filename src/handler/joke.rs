/// Random joke handler
use chrono::{DateTime, SecondsFormat, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::ApiResponse;

/// Fixed set the handler picks from
pub const JOKES: [&str; 20] = [
    "Why do programmers prefer dark mode? Because light attracts bugs.",
    "There are 10 kinds of people: those who understand binary and those who don't.",
    "A SQL query walks into a bar, walks up to two tables and asks: can I join you?",
    "Why did the developer go broke? Because he used up all his cache.",
    "How many programmers does it take to change a light bulb? None, that's a hardware problem.",
    "I would tell you a UDP joke, but you might not get it.",
    "Why do Java developers wear glasses? Because they don't C#.",
    "There's no place like 127.0.0.1.",
    "To understand recursion, you must first understand recursion.",
    "Knock knock. Race condition. Who's there?",
    "Why was the function sad? It didn't get called.",
    "An infinite number of mathematicians walk into a bar. The bartender pours two beers.",
    "It works on my machine. Then we'll ship your machine.",
    "Debugging: being the detective in a crime movie where you are also the murderer.",
    "Why did the cloud engineer break up? Too many unresolved dependencies.",
    "I've got a really good TCP joke. Do you want to hear it? Yes. Ready? Ready.",
    "Why don't containers ever get lonely? They always come in pods.",
    "The cloud is just someone else's computer.",
    "Why was the DNS server so relaxed? It had no unresolved issues.",
    "Real programmers count from 0.",
];

/// Body of the joke response
#[derive(Debug, Serialize, Deserialize)]
pub struct JokeBody {
    pub joke: String,
    /// ISO-8601 capture time
    pub timestamp: String,
}

/// Pick one joke uniformly at random
pub fn select<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    // JOKES is non-empty
    JOKES.choose(rng).copied().unwrap_or(JOKES[0])
}

/// Build the response for a given generator and capture time
pub fn respond<R: Rng + ?Sized>(rng: &mut R, now: DateTime<Utc>) -> ApiResponse {
    ApiResponse::ok(&JokeBody {
        joke: select(rng).to_string(),
        timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

pub fn handle() -> ApiResponse {
    respond(&mut rand::thread_rng(), Utc::now())
}
