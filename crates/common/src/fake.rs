//! Random but realistically shaped test data

use chrono::{Datelike, Duration, Local, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use serde_json::{Map, Value};

const FIRST_NAMES: &[&str] = &[
    "James", "Mary", "Robert", "Patricia", "John", "Jennifer", "Michael", "Linda", "David",
    "Elizabeth", "William", "Barbara", "Richard", "Susan", "Joseph", "Jessica", "Thomas", "Sarah",
    "Aisha", "Omar", "Mei", "Hiroshi", "Fatima", "Carlos", "Priya", "Lucas",
];

const LAST_NAMES: &[&str] = &[
    "Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis", "Rodriguez",
    "Martinez", "Hernandez", "Lopez", "Wilson", "Anderson", "Thomas", "Taylor", "Moore", "Jackson",
    "Martin", "Lee", "Khan", "Nguyen", "Patel", "Kim",
];

const STREET_SUFFIXES: &[&str] = &["Street", "Avenue", "Road", "Lane", "Drive", "Court", "Way"];

const CITIES: &[&str] = &[
    "Springfield", "Riverside", "Franklin", "Greenville", "Bristol", "Clinton", "Fairview",
    "Salem", "Madison", "Georgetown", "Arlington", "Ashland",
];

const STATES: &[&str] = &[
    "Alabama", "California", "Colorado", "Florida", "Georgia", "Illinois", "Maryland", "New York",
    "Ohio", "Oregon", "Texas", "Virginia", "Washington",
];

const COUNTRIES: &[&str] = &[
    "United States", "Canada", "United Kingdom", "Australia", "Germany", "France", "Japan",
    "Brazil", "India", "Mexico",
];

const EMAIL_DOMAINS: &[&str] = &["example.com", "example.org", "example.net", "test.io"];

const COMPANY_WORDS: &[&str] = &[
    "Acme", "Globex", "Initech", "Umbrella", "Stark", "Wayne", "Hooli", "Vandelay", "Soylent",
    "Tyrell", "Cyberdyne", "Wonka",
];

const COMPANY_SUFFIXES: &[&str] = &["Inc", "LLC", "Group", "Ltd", "and Sons", "Corp"];

const JOB_LEVELS: &[&str] = &["Senior", "Junior", "Lead", "Principal", "Associate", "Chief"];
const JOB_AREAS: &[&str] = &["Data", "Security", "Quality", "Marketing", "Operations", "Finance"];
const JOB_ROLES: &[&str] = &["Engineer", "Analyst", "Manager", "Consultant", "Designer", "Officer"];

const GENDERS: &[&str] = &["Male", "Female", "Non-binary"];

const WORDS: &[&str] = &[
    "lorem", "ipsum", "dolor", "sit", "amet", "consectetur", "adipiscing", "elit", "sed", "do",
    "eiusmod", "tempor", "incididunt", "ut", "labore", "et", "dolore", "magna", "aliqua", "enim",
    "minim", "veniam", "quis", "nostrud", "exercitation", "ullamco", "laboris", "nisi", "aliquip",
];

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_4) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0",
];

/// Card network prefixes and lengths
const CARD_PROVIDERS: &[(&str, &[&str], usize)] = &[
    ("visa", &["4"], 16),
    ("mastercard", &["51", "52", "53", "54", "55"], 16),
    ("amex", &["34", "37"], 15),
    ("discover", &["6011"], 16),
];

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FakeUser {
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub email: String,
    pub username: String,
    pub password: String,
    pub phone: String,
    pub date_of_birth: String,
    pub gender: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FakeAddress {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FakeCreditCard {
    pub number: String,
    pub cvv: String,
    pub expiry: String,
    pub holder_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FakeCompany {
    pub name: String,
    pub job_title: String,
    pub email: String,
    pub phone: String,
    pub website: String,
}

/// Test-data generator
pub struct FakeData<R = StdRng> {
    rng: R,
}

impl FakeData<StdRng> {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic sequence, for reproducible tests
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for FakeData<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> FakeData<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    fn pick(&mut self, items: &[&'static str]) -> &'static str {
        items.choose(&mut self.rng).copied().unwrap_or_default()
    }

    fn digits(&mut self, n: usize) -> String {
        (0..n)
            .map(|_| char::from(b'0' + self.rng.gen_range(0..10u8)))
            .collect()
    }

    pub fn first_name(&mut self) -> String {
        self.pick(FIRST_NAMES).to_string()
    }

    pub fn last_name(&mut self) -> String {
        self.pick(LAST_NAMES).to_string()
    }

    pub fn full_name(&mut self) -> String {
        format!("{} {}", self.first_name(), self.last_name())
    }

    pub fn middle_initial(&mut self) -> String {
        char::from(self.rng.gen_range(b'A'..=b'Z')).to_string()
    }

    pub fn email(&mut self) -> String {
        let domain = self.pick(EMAIL_DOMAINS);
        self.email_with_domain(domain)
    }

    pub fn email_with_domain(&mut self, domain: &str) -> String {
        format!(
            "{}.{}{}@{}",
            self.first_name().to_lowercase(),
            self.last_name().to_lowercase(),
            self.rng.gen_range(1..1000),
            domain
        )
    }

    pub fn phone_number(&mut self) -> String {
        format!("{}-{}-{}", self.rng.gen_range(200..1000), self.digits(3), self.digits(4))
    }

    pub fn formatted_phone_number(&mut self) -> String {
        format!("({}) {}-{}", self.rng.gen_range(200..1000), self.digits(3), self.digits(4))
    }

    /// `AAA-GG-SSSS` shaped, never a valid issued number (area 900-999)
    pub fn ssn(&mut self) -> String {
        format!("{}-{}-{}", self.rng.gen_range(900..1000), self.digits(2), self.digits(4))
    }

    pub fn username(&mut self) -> String {
        format!(
            "{}_{}{}",
            self.first_name().to_lowercase(),
            self.last_name().to_lowercase(),
            self.rng.gen_range(10..100)
        )
    }

    /// Password of `length` characters containing every character class
    pub fn password(&mut self, length: usize) -> String {
        const LOWER: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
        const UPPER: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
        const DIGITS: &[u8] = b"0123456789";
        const SYMBOLS: &[u8] = b"!@#$%^&*-_";
        let classes = [LOWER, UPPER, DIGITS, SYMBOLS];

        let mut chars: Vec<u8> = classes
            .iter()
            .take(length)
            .filter_map(|class| class.choose(&mut self.rng).copied())
            .collect();
        while chars.len() < length {
            let class = classes[self.rng.gen_range(0..classes.len())];
            if let Some(c) = class.choose(&mut self.rng) {
                chars.push(*c);
            }
        }
        chars.shuffle(&mut self.rng);
        String::from_utf8_lossy(&chars).into_owned()
    }

    /// Lower-case words joined by dashes
    pub fn memorable_password(&mut self, length: usize) -> String {
        let mut out = String::new();
        while out.len() < length {
            if !out.is_empty() {
                out.push('-');
            }
            out.push_str(self.pick(WORDS));
        }
        out.truncate(length);
        out
    }

    pub fn street_address(&mut self) -> String {
        format!(
            "{} {} {}",
            self.rng.gen_range(1..10_000),
            self.pick(LAST_NAMES),
            self.pick(STREET_SUFFIXES)
        )
    }

    pub fn city(&mut self) -> String {
        self.pick(CITIES).to_string()
    }

    pub fn state(&mut self) -> String {
        self.pick(STATES).to_string()
    }

    pub fn zip_code(&mut self) -> String {
        self.digits(5)
    }

    pub fn country(&mut self) -> String {
        self.pick(COUNTRIES).to_string()
    }

    pub fn full_address(&mut self) -> String {
        let a = self.random_address();
        format!("{}, {}, {} {}, {}", a.street, a.city, a.state, a.zip_code, a.country)
    }

    /// Birth date (`dd/MM/yyyy`) for someone aged between `min_age` and `max_age`
    pub fn date_of_birth(&mut self, min_age: u32, max_age: u32) -> String {
        let today = Local::now().date_naive();
        self.date_of_birth_from(today, min_age, max_age)
    }

    pub fn date_of_birth_from(&mut self, today: NaiveDate, min_age: u32, max_age: u32) -> String {
        let (lo, hi) = (min_age.min(max_age), min_age.max(max_age));
        let youngest = shift_years(today, lo);
        let oldest = shift_years(today, hi + 1) + Duration::days(1);
        let span = (youngest - oldest).num_days().max(0);
        let dob = oldest + Duration::days(self.rng.gen_range(0..=span));
        dob.format("%d/%m/%Y").to_string()
    }

    pub fn company_name(&mut self) -> String {
        format!("{} {}", self.pick(COMPANY_WORDS), self.pick(COMPANY_SUFFIXES))
    }

    pub fn job_title(&mut self) -> String {
        format!(
            "{} {} {}",
            self.pick(JOB_LEVELS),
            self.pick(JOB_AREAS),
            self.pick(JOB_ROLES)
        )
    }

    /// Luhn-valid card number from a random network
    pub fn credit_card_number(&mut self) -> String {
        let (provider, _, _) = CARD_PROVIDERS[self.rng.gen_range(0..CARD_PROVIDERS.len())];
        self.credit_card_number_for(provider)
    }

    /// Luhn-valid card number for `visa`, `mastercard`, `amex` or `discover`
    ///
    /// Unknown providers fall back to Visa.
    pub fn credit_card_number_for(&mut self, provider: &str) -> String {
        let provider = provider.to_lowercase();
        let (_, prefixes, length) = CARD_PROVIDERS
            .iter()
            .find(|(name, _, _)| *name == provider)
            .copied()
            .unwrap_or(CARD_PROVIDERS[0]);
        let mut number = self.pick(prefixes).to_string();
        let body = length - number.len() - 1;
        number.push_str(&self.digits(body));
        number.push(luhn_check_digit(&number));
        number
    }

    pub fn credit_card_cvv(&mut self) -> String {
        self.digits(3)
    }

    /// `MM/YY`, one to five years ahead
    pub fn credit_card_expiry(&mut self) -> String {
        let year = Local::now().year() + self.rng.gen_range(1..=5);
        format!("{:02}/{:02}", self.rng.gen_range(1..=12), year % 100)
    }

    pub fn gender(&mut self) -> String {
        self.pick(GENDERS).to_string()
    }

    pub fn word(&mut self) -> String {
        self.pick(WORDS).to_string()
    }

    pub fn words(&mut self, count: usize) -> String {
        (0..count).map(|_| self.pick(WORDS)).collect::<Vec<_>>().join(" ")
    }

    pub fn sentence(&mut self) -> String {
        let count = self.rng.gen_range(5..12);
        let mut s = self.words(count);
        if let Some(first) = s.get(0..1) {
            let upper = first.to_uppercase();
            s.replace_range(0..1, &upper);
        }
        s.push('.');
        s
    }

    pub fn paragraph(&mut self) -> String {
        let count = self.rng.gen_range(3..6);
        (0..count).map(|_| self.sentence()).collect::<Vec<_>>().join(" ")
    }

    /// Inclusive range
    pub fn number(&mut self, min: i64, max: i64) -> i64 {
        let (lo, hi) = (min.min(max), min.max(max));
        self.rng.gen_range(lo..=hi)
    }

    pub fn boolean(&mut self) -> bool {
        self.rng.gen()
    }

    pub fn uuid(&mut self) -> String {
        uuid::Builder::from_random_bytes(self.rng.gen())
            .into_uuid()
            .to_string()
    }

    pub fn slug(&mut self) -> String {
        let count = self.rng.gen_range(2..5);
        (0..count).map(|_| self.pick(WORDS)).collect::<Vec<_>>().join("-")
    }

    pub fn color_hex(&mut self) -> String {
        format!("#{:06x}", self.rng.gen_range(0..0x1000000u32))
    }

    pub fn image_url(&mut self, width: u32, height: u32) -> String {
        format!("https://picsum.photos/seed/{}/{}/{}", self.slug(), width, height)
    }

    pub fn avatar_url(&mut self) -> String {
        format!("https://i.pravatar.cc/150?u={}", self.uuid())
    }

    pub fn website_url(&mut self) -> String {
        format!("https://www.{}.com", self.pick(COMPANY_WORDS).to_lowercase())
    }

    pub fn ipv4(&mut self) -> String {
        let octets: [u8; 4] = self.rng.gen();
        std::net::Ipv4Addr::from(octets).to_string()
    }

    pub fn ipv6(&mut self) -> String {
        let segments: [u16; 8] = self.rng.gen();
        std::net::Ipv6Addr::from(segments).to_string()
    }

    pub fn mac_address(&mut self) -> String {
        let bytes: [u8; 6] = self.rng.gen();
        bytes
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect::<Vec<_>>()
            .join(":")
    }

    pub fn user_agent(&mut self) -> String {
        self.pick(USER_AGENTS).to_string()
    }

    pub fn headline(&mut self) -> String {
        let count = self.rng.gen_range(3..7);
        self.words(count)
            .split(' ')
            .map(capitalize)
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn description(&mut self) -> String {
        self.paragraph()
    }

    pub fn random_user(&mut self) -> FakeUser {
        let first_name = self.first_name();
        let last_name = self.last_name();
        let email = format!(
            "{}.{}{}@{}",
            first_name.to_lowercase(),
            last_name.to_lowercase(),
            self.rng.gen_range(1..1000),
            self.pick(EMAIL_DOMAINS)
        );
        FakeUser {
            full_name: format!("{} {}", first_name, last_name),
            username: self.username(),
            password: self.password(12),
            phone: self.phone_number(),
            date_of_birth: self.date_of_birth(18, 65),
            gender: self.gender(),
            first_name,
            last_name,
            email,
        }
    }

    pub fn random_address(&mut self) -> FakeAddress {
        FakeAddress {
            street: self.street_address(),
            city: self.city(),
            state: self.state(),
            zip_code: self.zip_code(),
            country: self.country(),
        }
    }

    pub fn random_credit_card(&mut self) -> FakeCreditCard {
        FakeCreditCard {
            number: self.credit_card_number(),
            cvv: self.credit_card_cvv(),
            expiry: self.credit_card_expiry(),
            holder_name: self.full_name(),
        }
    }

    pub fn random_company(&mut self) -> FakeCompany {
        let name = self.company_name();
        let domain = format!(
            "{}.com",
            name.split_whitespace().next().unwrap_or("company").to_lowercase()
        );
        FakeCompany {
            job_title: self.job_title(),
            email: self.email_with_domain(&domain),
            phone: self.formatted_phone_number(),
            website: format!("https://www.{}", domain),
            name,
        }
    }

    /// Build an object with one generated value per named field kind
    ///
    /// Unrecognised kinds map to `null`.
    pub fn custom_data(&mut self, fields: &[&str]) -> Map<String, Value> {
        let mut out = Map::new();
        for field in fields {
            let value = match *field {
                "firstName" => Value::from(self.first_name()),
                "lastName" => Value::from(self.last_name()),
                "fullName" => Value::from(self.full_name()),
                "email" => Value::from(self.email()),
                "phone" => Value::from(self.phone_number()),
                "username" => Value::from(self.username()),
                "password" => Value::from(self.password(12)),
                "address" => Value::from(self.street_address()),
                "city" => Value::from(self.city()),
                "state" => Value::from(self.state()),
                "zipCode" => Value::from(self.zip_code()),
                "country" => Value::from(self.country()),
                "company" => Value::from(self.company_name()),
                "jobTitle" => Value::from(self.job_title()),
                "uuid" => Value::from(self.uuid()),
                "number" => Value::from(self.number(0, 100)),
                "boolean" => Value::from(self.boolean()),
                "sentence" => Value::from(self.sentence()),
                _ => Value::Null,
            };
            out.insert(field.to_string(), value);
        }
        out
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn shift_years(date: NaiveDate, years: u32) -> NaiveDate {
    date.checked_sub_months(chrono::Months::new(years * 12))
        .unwrap_or(NaiveDate::MIN)
}

/// Digit that makes `partial` + digit pass the Luhn check
fn luhn_check_digit(partial: &str) -> char {
    let sum: u32 = partial
        .chars()
        .rev()
        .filter_map(|c| c.to_digit(10))
        .enumerate()
        .map(|(i, d)| {
            if i % 2 == 0 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum();
    char::from(b'0' + ((10 - sum % 10) % 10) as u8)
}
