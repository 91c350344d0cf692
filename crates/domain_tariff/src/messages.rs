//! Human readable failure messages
//!
//! Messages reach reception staff, so they are Persian by default. Texts
//! live in Fluent resources below; English is kept for logs and for
//! integrations that ask for it.

use fluent::concurrent::FluentBundle;
use fluent::{FluentArgs, FluentResource};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use tracing::warn;
use unic_langid::LanguageIdentifier;

use crate::rules::LimitViolation;
use crate::share::ShareError;

const FA_IR: &str = r#"
invalid-tariff-price = مبلغ تعرفه باید بزرگتر از صفر باشد (مقدار: { $price })
invalid-percentage = درصد { $field } باید بین ۰ تا ۱۰۰ باشد (مقدار: { $value })
percentage-sum-exceeded = مجموع درصد سهم بیمار ({ $patient }) و سهم بیمه ({ $insurer }) نمی‌تواند بیشتر از ۱۰۰ باشد
invalid-deductible = مبلغ فرانشیز نمی‌تواند منفی باشد (مقدار: { $amount })
invalid-payment-ceiling = سقف پرداخت بیمه تکمیلی نمی‌تواند منفی باشد (مقدار: { $amount })
invalid-amount = مبلغ نامعتبر است: { $detail }
insurer-limit-exceeded = سهم بیمه ({ $share }) از سقف پرداخت مجاز ({ $limit }) بیشتر است
patient-limit-exceeded = سهم بیمار ({ $share }) از سقف پرداخت مجاز ({ $limit }) بیشتر است
"#;

const EN_US: &str = r#"
invalid-tariff-price = Tariff price must be greater than zero (got { $price })
invalid-percentage = { $field } must be between 0 and 100 (got { $value })
percentage-sum-exceeded = Patient share ({ $patient }) and insurer share ({ $insurer }) percentages add up to more than 100
invalid-deductible = Deductible must not be negative (got { $amount })
invalid-payment-ceiling = Supplementary payment ceiling must not be negative (got { $amount })
invalid-amount = Invalid amount: { $detail }
insurer-limit-exceeded = Insurer share ({ $share }) exceeds the payment limit ({ $limit })
patient-limit-exceeded = Patient share ({ $share }) exceeds the payment limit ({ $limit })
"#;

/// Language of rendered messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Locale {
    #[default]
    #[serde(rename = "fa-IR")]
    Persian,
    #[serde(rename = "en-US")]
    English,
}

impl Locale {
    pub const SUPPORTED: [Locale; 2] = [Locale::Persian, Locale::English];

    pub fn tag(&self) -> &'static str {
        match self {
            Locale::Persian => "fa-IR",
            Locale::English => "en-US",
        }
    }

    pub fn language_id(&self) -> LanguageIdentifier {
        self.tag().parse().unwrap_or_default()
    }

    /// Maps a negotiated language identifier back to a locale
    pub fn from_language_id(id: &LanguageIdentifier) -> Option<Self> {
        match id.language.as_str() {
            "fa" => Some(Locale::Persian),
            "en" => Some(Locale::English),
            _ => None,
        }
    }

    fn source(&self) -> &'static str {
        match self {
            Locale::Persian => FA_IR,
            Locale::English => EN_US,
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id: LanguageIdentifier = s
            .trim()
            .parse()
            .map_err(|e| format!("invalid locale '{}': {}", s, e))?;
        Locale::from_language_id(&id).ok_or_else(|| format!("unsupported locale '{}'", s))
    }
}

/// Renders a calculator error for staff
pub fn share_error_message(error: &ShareError, locale: Locale) -> String {
    let mut args = FluentArgs::new();
    let id = match error {
        ShareError::InvalidTariffPrice(price) => {
            args.set("price", price.to_string());
            "invalid-tariff-price"
        }
        ShareError::InvalidPercentage { field, value } => {
            args.set("field", *field);
            args.set("value", value.to_string());
            "invalid-percentage"
        }
        ShareError::PercentageSumExceeded {
            patient, insurer, ..
        } => {
            args.set("patient", patient.to_string());
            args.set("insurer", insurer.to_string());
            "percentage-sum-exceeded"
        }
        ShareError::InvalidDeductible(amount) => {
            args.set("amount", amount.to_string());
            "invalid-deductible"
        }
        ShareError::InvalidPaymentCeiling(amount) => {
            args.set("amount", amount.to_string());
            "invalid-payment-ceiling"
        }
        ShareError::Money(inner) => {
            args.set("detail", inner.to_string());
            "invalid-amount"
        }
    };
    render(locale, id, &args).unwrap_or_else(|| error.to_string())
}

/// Renders an exceeded payment ceiling for staff
pub fn limit_violation_message(violation: &LimitViolation, locale: Locale) -> String {
    let mut args = FluentArgs::new();
    let (id, share, limit) = match violation {
        LimitViolation::Insurer { share, limit } => ("insurer-limit-exceeded", share, limit),
        LimitViolation::Patient { share, limit } => ("patient-limit-exceeded", share, limit),
    };
    args.set("share", share.to_string());
    args.set("limit", limit.to_string());
    render(locale, id, &args).unwrap_or_else(|| format!("{}: {} > {}", id, share, limit))
}

type Bundle = FluentBundle<FluentResource>;

/// Parsed bundle for `locale`, built on first use and shared afterwards
fn bundle(locale: Locale) -> Option<&'static Bundle> {
    static PERSIAN: OnceLock<Option<Bundle>> = OnceLock::new();
    static ENGLISH: OnceLock<Option<Bundle>> = OnceLock::new();

    let cell = match locale {
        Locale::Persian => &PERSIAN,
        Locale::English => &ENGLISH,
    };
    cell.get_or_init(|| build_bundle(locale)).as_ref()
}

fn build_bundle(locale: Locale) -> Option<Bundle> {
    let resource = match FluentResource::try_new(locale.source().to_string()) {
        Ok(resource) => resource,
        Err((_, errors)) => {
            warn!(locale = %locale, errors = ?errors, "Message resource failed to parse");
            return None;
        }
    };

    let mut bundle = FluentBundle::new_concurrent(vec![locale.language_id()]);
    bundle.set_use_isolating(false);
    if let Err(errors) = bundle.add_resource(resource) {
        warn!(locale = %locale, errors = ?errors, "Message resource rejected");
        return None;
    }
    Some(bundle)
}

/// Formats one message; `None` only if the bundled resources are broken
fn render(locale: Locale, id: &str, args: &FluentArgs) -> Option<String> {
    let bundle = bundle(locale)?;
    let pattern = bundle.get_message(id)?.value()?;
    let mut errors = Vec::new();
    let text = bundle.format_pattern(pattern, Some(args), &mut errors);
    if !errors.is_empty() {
        warn!(message = id, errors = ?errors, "Message formatted with errors");
    }
    Some(text.into_owned())
}
