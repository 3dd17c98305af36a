use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::enums::Gender;

/// Patients are keyed by their national insurance number (SNILS), digits only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub snils: String,
    pub surname: String,
    pub name: String,
    pub patronymic: Option<String>,
    pub birth_date: NaiveDate,
    pub phone: String,
    pub gender: Gender,
}

impl Patient {
    pub fn display_name(&self) -> String {
        match &self.patronymic {
            Some(p) => format!("{} {} {}", self.surname, self.name, p),
            None => format!("{} {}", self.surname, self.name),
        }
    }
}
