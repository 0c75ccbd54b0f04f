use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::PatientId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum UserError {
    #[error("user name cannot be empty")]
    EmptyName,

    #[error("unrecognized role: {raw}")]
    UnknownRole { raw: String },
}

//
// ─── ROLE ──────────────────────────────────────────────────────────────────────
//

/// Account role assigned by the backend. Drives which main menu a signed-in
/// user lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Patient,
    Clinician,
}

impl Role {
    /// Honorific prepended to the user's name in farewells.
    #[must_use]
    pub fn honorific(self) -> &'static str {
        match self {
            Role::Patient => "",
            Role::Clinician => "Dr. ",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Patient => write!(f, "patient"),
            Role::Clinician => write!(f, "clinician"),
        }
    }
}

impl FromStr for Role {
    type Err = UserError;

    /// Parses the backend's `rol` strings, accepting both the Spanish wire
    /// values and their English equivalents.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "paciente" | "patient" => Ok(Role::Patient),
            "medico" | "médico" | "doctor" | "clinician" => Ok(Role::Clinician),
            _ => Err(UserError::UnknownRole { raw: s.to_string() }),
        }
    }
}

//
// ─── USER ──────────────────────────────────────────────────────────────────────
//

/// Profile of the signed-in account. Created on successful login and cleared
/// on logout or session reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    name: String,
    surname: String,
    identification: PatientId,
    age: u8,
    sex: String,
    role: Role,
}

impl User {
    /// Creates a new user profile.
    ///
    /// # Errors
    ///
    /// Returns `UserError::EmptyName` if the name is blank.
    pub fn new(
        name: impl Into<String>,
        surname: impl Into<String>,
        identification: PatientId,
        age: u8,
        sex: impl Into<String>,
        role: Role,
    ) -> Result<Self, UserError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(UserError::EmptyName);
        }
        Ok(Self {
            name,
            surname: surname.into(),
            identification,
            age,
            sex: sex.into(),
            role,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn surname(&self) -> &str {
        &self.surname
    }

    #[must_use]
    pub fn identification(&self) -> &PatientId {
        &self.identification
    }

    #[must_use]
    pub fn age(&self) -> u8 {
        self.age
    }

    #[must_use]
    pub fn sex(&self) -> &str {
        &self.sex
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }
}
