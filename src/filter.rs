use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

use crate::models::ListingRecord;

/// Names of the filters a user can set. Parsing accepts the alternate
/// spellings the listing UI has used over time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterField {
    Role,
    CompanyName,
    Location,
    Remote,
    TechStack,
    MinExperience,
    MinSalary,
    EmployeeCount,
}

impl FilterField {
    pub const ALL: [FilterField; 8] = [
        FilterField::Role,
        FilterField::CompanyName,
        FilterField::Location,
        FilterField::Remote,
        FilterField::TechStack,
        FilterField::MinExperience,
        FilterField::MinSalary,
        FilterField::EmployeeCount,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FilterField::Role => "role",
            FilterField::CompanyName => "companyName",
            FilterField::Location => "location",
            FilterField::Remote => "remote",
            FilterField::TechStack => "techStack",
            FilterField::MinExperience => "minExperience",
            FilterField::MinSalary => "minSalary",
            FilterField::EmployeeCount => "employeeCount",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FilterField::Role => "Role",
            FilterField::CompanyName => "Company",
            FilterField::Location => "Location",
            FilterField::Remote => "Remote",
            FilterField::TechStack => "Tech stack",
            FilterField::MinExperience => "Min experience",
            FilterField::MinSalary => "Min base pay",
            FilterField::EmployeeCount => "Employees",
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, FilterField::MinExperience | FilterField::MinSalary)
    }
}

impl fmt::Display for FilterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown filter '{0}'")]
pub struct UnknownFilter(pub String);

impl FromStr for FilterField {
    type Err = UnknownFilter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "role" => Ok(FilterField::Role),
            "companyname" | "company" => Ok(FilterField::CompanyName),
            "location" => Ok(FilterField::Location),
            "remote" => Ok(FilterField::Remote),
            "techstack" => Ok(FilterField::TechStack),
            "minexperience" | "experience" => Ok(FilterField::MinExperience),
            "minsalary" | "minbasepay" | "salary" => Ok(FilterField::MinSalary),
            "employeecount" | "totalemployees" | "employees" => Ok(FilterField::EmployeeCount),
            _ => Err(UnknownFilter(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterArgError {
    #[error("expected NAME=VALUE, got '{0}'")]
    MissingValue(String),
    #[error(transparent)]
    Unknown(#[from] UnknownFilter),
}

/// Parses a `name=value` filter assignment, accepting any spelling of the
/// name that [`FilterField::from_str`] does.
pub fn parse_filter_arg(arg: &str) -> Result<(FilterField, String), FilterArgError> {
    let (name, value) = arg
        .split_once('=')
        .ok_or_else(|| FilterArgError::MissingValue(arg.to_string()))?;
    let field = name.trim().parse::<FilterField>()?;
    Ok((field, value.trim().to_string()))
}

/// Active filter set. Empty strings and `None` mean "no constraint".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterCriteria {
    pub role: String,
    pub company_name: String,
    pub location: String,
    pub tech_stack: String,
    pub employee_count: String,
    pub remote: bool,
    pub min_experience: Option<f64>,
    pub min_salary: Option<f64>,
}

impl FilterCriteria {
    /// Sets one filter from raw user text.
    pub fn set(&mut self, field: FilterField, value: &str) {
        let value = value.trim();
        match field {
            FilterField::Role => self.role = value.to_string(),
            FilterField::CompanyName => self.company_name = value.to_string(),
            FilterField::Location => self.location = value.to_string(),
            FilterField::TechStack => self.tech_stack = value.to_string(),
            FilterField::EmployeeCount => self.employee_count = value.to_string(),
            FilterField::Remote => self.remote = parse_flag(value),
            FilterField::MinExperience => self.min_experience = parse_number(value),
            FilterField::MinSalary => self.min_salary = parse_number(value),
        }
    }

    /// Current value of a filter as display text.
    pub fn value(&self, field: FilterField) -> String {
        match field {
            FilterField::Role => self.role.clone(),
            FilterField::CompanyName => self.company_name.clone(),
            FilterField::Location => self.location.clone(),
            FilterField::TechStack => self.tech_stack.clone(),
            FilterField::EmployeeCount => self.employee_count.clone(),
            FilterField::Remote => if self.remote { "yes".to_string() } else { String::new() },
            FilterField::MinExperience => self.min_experience.map(|v| v.to_string()).unwrap_or_default(),
            FilterField::MinSalary => self.min_salary.map(|v| v.to_string()).unwrap_or_default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == FilterCriteria::default()
    }

    pub fn matches(&self, record: &ListingRecord) -> bool {
        contains_ci(Some(&record.role), &self.role)
            && contains_ci(Some(&record.company_name), &self.company_name)
            && contains_ci(Some(&record.location), &self.location)
            && contains_ci(record.description.as_deref(), &self.tech_stack)
            && contains_ci(record.employee_count.as_deref(), &self.employee_count)
            && (!self.remote || record.is_remote())
            && at_least(record.min_experience, self.min_experience)
            && at_least(record.min_salary, self.min_salary)
    }
}

/// Records matching every active criterion, in their original order.
pub fn apply_filters<'a>(records: &'a [ListingRecord], criteria: &FilterCriteria) -> Vec<&'a ListingRecord> {
    records.iter().filter(|record| criteria.matches(record)).collect()
}

fn contains_ci(haystack: Option<&str>, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    match haystack {
        Some(text) => text.to_lowercase().contains(&needle.to_lowercase()),
        None => false,
    }
}

fn at_least(value: Option<f64>, bound: Option<f64>) -> bool {
    match (value, bound) {
        (_, None) => true,
        (Some(value), Some(bound)) => value >= bound,
        (None, Some(_)) => false,
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "true" | "yes" | "y" | "1" | "on" | "remote"
    )
}

fn parse_number(value: &str) -> Option<f64> {
    static NUMBER: OnceLock<Regex> = OnceLock::new();
    let re = NUMBER.get_or_init(|| Regex::new(r"\d+(?:\.\d+)?").expect("valid number pattern"));
    re.find(value).and_then(|m| m.as_str().parse().ok())
}
