use serde::{Deserialize, Serialize};

/// One job posting as delivered by the listing endpoint, normalized into a
/// single schema regardless of how the endpoint spells its fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingRecord {
    pub id: String,
    pub role: String,
    pub company_name: String,
    pub location: String,
    pub min_experience: Option<f64>, // years
    pub max_experience: Option<f64>,
    pub min_salary: Option<f64>,
    pub max_salary: Option<f64>,
    pub salary_currency: Option<String>, // ISO code, e.g. "USD"
    pub remote: Option<bool>,
    pub employee_count: Option<String>, // free text, e.g. "51-200"
    pub description: Option<String>,
    pub link: Option<String>,
    pub logo_url: Option<String>,
}

impl ListingRecord {
    /// Explicit flag wins; otherwise a location mentioning "remote" counts.
    pub fn is_remote(&self) -> bool {
        match self.remote {
            Some(flag) => flag,
            None => self.location.to_lowercase().contains("remote"),
        }
    }

    pub fn salary_range(&self) -> Option<String> {
        let symbol = currency_symbol(self.salary_currency.as_deref().unwrap_or("USD"));
        match (self.min_salary, self.max_salary) {
            (Some(min), Some(max)) => Some(format!("{}{} - {}", symbol, fmt_num(min), fmt_num(max))),
            (None, Some(max)) => Some(format!("{}0 - {}", symbol, fmt_num(max))),
            (Some(min), None) => Some(format!("{}{}+", symbol, fmt_num(min))),
            (None, None) => None,
        }
    }

    pub fn experience_range(&self) -> Option<String> {
        match (self.min_experience, self.max_experience) {
            (Some(min), Some(max)) => Some(format!("{}-{} years", fmt_num(min), fmt_num(max))),
            (Some(min), None) => Some(format!("{}+ years", fmt_num(min))),
            (None, Some(max)) => Some(format!("up to {} years", fmt_num(max))),
            (None, None) => None,
        }
    }
}

pub fn currency_symbol(code: &str) -> String {
    match code.to_ascii_uppercase().as_str() {
        "USD" => "$".to_string(),
        "INR" => "₹".to_string(),
        "EUR" => "€".to_string(),
        "GBP" => "£".to_string(),
        other => format!("{} ", other),
    }
}

fn fmt_num(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{:.1}", value)
    }
}

/// Raw listing as the endpoint sends it. Every field may be null.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiListing {
    pub jd_uid: String,
    pub jd_link: Option<String>,
    pub job_details_from_company: Option<String>,
    pub max_jd_salary: Option<f64>,
    pub min_jd_salary: Option<f64>,
    pub salary_currency_code: Option<String>,
    pub location: Option<String>,
    pub min_exp: Option<f64>,
    pub max_exp: Option<f64>,
    pub job_role: Option<String>,
    pub company_name: Option<String>,
    pub logo_url: Option<String>,
    pub remote: Option<RemoteField>,
    // both spellings occur, sometimes on the same listing
    #[serde(default)]
    pub employee_count: Option<serde_json::Value>,
    #[serde(default)]
    pub total_employees: Option<serde_json::Value>,
}

/// `remote` shows up either as a boolean or as free text.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RemoteField {
    Flag(bool),
    Text(String),
}

impl RemoteField {
    fn as_flag(&self) -> bool {
        match self {
            RemoteField::Flag(flag) => *flag,
            RemoteField::Text(text) => {
                let text = text.trim().to_lowercase();
                matches!(text.as_str(), "true" | "yes" | "1") || text.contains("remote")
            }
        }
    }
}

/// Employee counts arrive as integers, floats (`60.0`) or text ("51-200").
/// Anything else is dropped rather than failing the whole page.
fn employee_count_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(text) => Some(text.clone()),
        serde_json::Value::Number(n) => match (n.as_u64(), n.as_f64()) {
            (Some(count), _) => Some(count.to_string()),
            (None, Some(count)) => Some(fmt_num(count)),
            (None, None) => None,
        },
        _ => None,
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPage {
    pub jd_list: Vec<ApiListing>,
    pub total_count: Option<u64>,
}

impl From<ApiListing> for ListingRecord {
    fn from(raw: ApiListing) -> Self {
        ListingRecord {
            id: raw.jd_uid,
            role: raw.job_role.unwrap_or_default(),
            company_name: raw.company_name.unwrap_or_default(),
            location: raw.location.unwrap_or_default(),
            min_experience: raw.min_exp,
            max_experience: raw.max_exp,
            min_salary: raw.min_jd_salary,
            max_salary: raw.max_jd_salary,
            salary_currency: raw.salary_currency_code,
            remote: raw.remote.as_ref().map(RemoteField::as_flag),
            employee_count: raw
                .employee_count
                .as_ref()
                .and_then(employee_count_text)
                .or_else(|| raw.total_employees.as_ref().and_then(employee_count_text)),
            description: raw.job_details_from_company,
            link: raw.jd_link,
            logo_url: raw.logo_url,
        }
    }
}

#[cfg(test)]
pub(crate) fn sample(id: &str, role: &str, company: &str) -> ListingRecord {
    ListingRecord {
        id: id.to_string(),
        role: role.to_string(),
        company_name: company.to_string(),
        location: "bangalore".to_string(),
        min_experience: None,
        max_experience: None,
        min_salary: None,
        max_salary: None,
        salary_currency: None,
        remote: None,
        employee_count: None,
        description: None,
        link: None,
        logo_url: None,
    }
}
