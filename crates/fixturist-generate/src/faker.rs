use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use fake::Fake;
use fake::faker::address::en::{CityName, CountryName};
use fake::faker::company::en::CompanyName;
use fake::faker::internet::en::{SafeEmail, Username};
use fake::faker::lorem::en::{Paragraph, Sentence, Word};
use fake::faker::name::en::{FirstName, LastName, Name};
use fake::faker::phone_number::en::PhoneNumber;
use rand::seq::IndexedRandom;
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde_json::{Value, json};

use fixturist_plan::BuiltinGenerator;

/// Seeded pseudo-random source shared by the planner, user factories and
/// scalar generation. Two runs with the same seed draw the same values.
#[derive(Debug, Clone)]
pub struct Faker {
    rng: ChaCha8Rng,
}

impl Faker {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }

    /// Uniform integer in `[min, max]`; bounds are swapped when reversed.
    pub fn integer(&mut self, min: i64, max: i64) -> i64 {
        let (min, max) = ordered(min, max);
        self.rng.random_range(min..=max)
    }

    /// Uniform count in `[min, max]`.
    pub fn count(&mut self, min: u64, max: u64) -> u64 {
        let (min, max) = ordered(min, max);
        self.rng.random_range(min..=max)
    }

    /// Uniform float in `[min, max]` rounded to `decimals` places.
    pub fn floating(&mut self, min: f64, max: f64, decimals: i32) -> f64 {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        let value = self.rng.random_range(min..=max);
        let factor = 10_f64.powi(decimals);
        (value * factor).round() / factor
    }

    pub fn bool(&mut self) -> bool {
        self.rng.random_bool(0.5)
    }

    pub fn word(&mut self) -> String {
        Word().fake_with_rng(&mut self.rng)
    }

    pub fn date(&mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> DateTime<Utc> {
        let (start, end) = ordered(start.timestamp(), end.timestamp());
        let seconds = self.rng.random_range(start..=end);
        Utc.timestamp_opt(seconds, 0).single().unwrap_or_default()
    }

    /// Random UUID in v4 layout drawn from the seeded stream.
    pub fn guid(&mut self) -> String {
        let mut bytes = [0_u8; 16];
        self.rng.fill_bytes(&mut bytes);
        uuid::Builder::from_random_bytes(bytes)
            .into_uuid()
            .to_string()
    }

    pub fn pick_one<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        items.choose(&mut self.rng)
    }

    pub fn builtin(&mut self, generator: BuiltinGenerator) -> Value {
        let text: String = match generator {
            BuiltinGenerator::Word => Word().fake_with_rng(&mut self.rng),
            BuiltinGenerator::Sentence => Sentence(3..8).fake_with_rng(&mut self.rng),
            BuiltinGenerator::Paragraph => Paragraph(2..4).fake_with_rng(&mut self.rng),
            BuiltinGenerator::Name => Name().fake_with_rng(&mut self.rng),
            BuiltinGenerator::FirstName => FirstName().fake_with_rng(&mut self.rng),
            BuiltinGenerator::LastName => LastName().fake_with_rng(&mut self.rng),
            BuiltinGenerator::Email => SafeEmail().fake_with_rng(&mut self.rng),
            BuiltinGenerator::Username => Username().fake_with_rng(&mut self.rng),
            BuiltinGenerator::Company => CompanyName().fake_with_rng(&mut self.rng),
            BuiltinGenerator::City => CityName().fake_with_rng(&mut self.rng),
            BuiltinGenerator::Country => CountryName().fake_with_rng(&mut self.rng),
            BuiltinGenerator::Phone => PhoneNumber().fake_with_rng(&mut self.rng),
            BuiltinGenerator::Guid => self.guid(),
            BuiltinGenerator::Integer => return json!(self.integer(-2000, 2000)),
            BuiltinGenerator::Floating => return json!(self.floating(-1000.0, 1000.0, 2)),
            BuiltinGenerator::Bool => return json!(self.bool()),
            BuiltinGenerator::Date => {
                let (start, end) = date_range();
                self.date(start, end)
                    .to_rfc3339_opts(SecondsFormat::Millis, true)
            }
        };
        Value::String(text)
    }
}

/// Default window for generated dates: the unix epoch up to 2038-02-19.
pub fn date_range() -> (DateTime<Utc>, DateTime<Utc>) {
    let start = DateTime::<Utc>::UNIX_EPOCH;
    let end = Utc
        .with_ymd_and_hms(2038, 2, 19, 0, 0, 0)
        .single()
        .unwrap_or(start);
    (start, end)
}

fn ordered<T: PartialOrd>(a: T, b: T) -> (T, T) {
    if a <= b { (a, b) } else { (b, a) }
}
