#![forbid(unsafe_code)]
#![deny(
    unreachable_pub,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
//! Shared DTOs for the XNAT REST payloads consumed by the CLI.
//!
//! XNAT wraps every `format=json` listing in a `ResultSet` envelope and uses
//! legacy field casing (`ID`, `URI`, `subject_ID`, `xsiType`). The rename
//! attributes here are the single place that casing is spelled out; command
//! handlers only ever see the Rust-cased accessors.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Envelope wrapping every `format=json` listing response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultSetEnvelope<T> {
    /// The `ResultSet` object carrying the rows.
    #[serde(rename = "ResultSet")]
    pub result_set: ResultSet<T>,
}

/// The `ResultSet` object inside a listing envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultSet<T> {
    /// Listing rows.
    #[serde(rename = "Result")]
    pub result: Vec<T>,
    /// Row count as reported by the server (a decimal string).
    #[serde(
        rename = "totalRecords",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub total_records: Option<String>,
}

impl<T> ResultSetEnvelope<T> {
    /// Consume the envelope and return the listing rows.
    #[must_use]
    pub fn into_rows(self) -> Vec<T> {
        self.result_set.result
    }

    /// Number of rows in the listing.
    #[must_use]
    pub fn len(&self) -> usize {
        self.result_set.result.len()
    }

    /// Whether the listing carried no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.result_set.result.is_empty()
    }
}

/// One row of `GET /data/projects`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectRecord {
    /// Project identifier.
    #[serde(rename = "ID")]
    pub id: String,
    /// Human-readable project name.
    #[serde(default)]
    pub name: String,
    /// Principal investigator first name; empty when unset.
    #[serde(default)]
    pub pi_firstname: String,
    /// Principal investigator last name; empty when unset.
    #[serde(default)]
    pub pi_lastname: String,
    /// Server-side insertion timestamp; empty when the server omits it.
    #[serde(default)]
    pub insert_date: String,
    /// Resource path of the project.
    #[serde(rename = "URI", default)]
    pub uri: String,
}

impl ProjectRecord {
    /// Principal investigator as `Last, First`, or `NONE` when both parts are
    /// empty.
    #[must_use]
    pub fn pi(&self) -> String {
        if self.pi_firstname.is_empty() && self.pi_lastname.is_empty() {
            "NONE".to_string()
        } else {
            format!("{}, {}", self.pi_lastname, self.pi_firstname)
        }
    }
}

/// One row of a subject listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectRecord {
    /// Subject accession identifier.
    #[serde(rename = "ID")]
    pub id: String,
    /// Subject label within the project.
    #[serde(default)]
    pub label: String,
    /// Owning project identifier.
    #[serde(default)]
    pub project: String,
    /// Server-side insertion timestamp, echoed verbatim.
    #[serde(default)]
    pub insert_date: String,
}

/// One row of an experiment (imaging session) listing or lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentRecord {
    /// Experiment accession identifier.
    #[serde(rename = "ID")]
    pub id: String,
    /// Experiment label within the project.
    #[serde(default)]
    pub label: String,
    /// Owning project identifier.
    #[serde(default)]
    pub project: String,
    /// Accession identifier of the owning subject.
    #[serde(rename = "subject_ID", default)]
    pub subject_id: String,
    /// Server-side insertion timestamp, echoed verbatim.
    #[serde(default)]
    pub insert_date: String,
    /// Schema type of the experiment, e.g. `xnat:mrSessionData`.
    #[serde(rename = "xsiType", default)]
    pub xsi_type: String,
}

impl ExperimentRecord {
    /// Modality derived from the schema type: `xnat:mrSessionData` maps to
    /// `MR`. Types outside the `xnat:*SessionData` shape map to `Unknown`.
    #[must_use]
    pub fn modality(&self) -> String {
        self.xsi_type
            .strip_prefix("xnat:")
            .and_then(|rest| rest.strip_suffix("SessionData"))
            .filter(|short| !short.is_empty())
            .map_or_else(|| "Unknown".to_string(), str::to_uppercase)
    }
}

/// One row of an experiment scan listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRecord {
    /// Scan identifier within the experiment.
    #[serde(rename = "ID")]
    pub id: String,
    /// Scan type label, e.g. `T1w`.
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// Project accessibility states accepted by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Accessibility {
    /// Anyone may see and download the project data.
    Public,
    /// Anyone may see the project; data requires membership.
    Protected,
    /// Only members may see the project.
    Private,
}

impl Accessibility {
    /// Wire representation used in accessibility URLs and response bodies.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Protected => "protected",
            Self::Private => "private",
        }
    }
}

impl Display for Accessibility {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Error raised when a string is not a known accessibility state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown accessibility '{0}' (expected public, protected, or private)")]
pub struct InvalidAccessibility(pub String);

impl FromStr for Accessibility {
    type Err = InvalidAccessibility;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "public" => Ok(Self::Public),
            "protected" => Ok(Self::Protected),
            "private" => Ok(Self::Private),
            _ => Err(InvalidAccessibility(value.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn project_listing_deserializes_result_set() {
        let body = json!({
            "ResultSet": {
                "Result": [
                    {
                        "ID": "projA",
                        "name": "Project A",
                        "pi_firstname": "Ada",
                        "pi_lastname": "Lovelace",
                        "URI": "/data/projects/projA"
                    },
                    {
                        "ID": "projB",
                        "name": "Project B",
                        "pi_firstname": "",
                        "pi_lastname": ""
                    }
                ],
                "totalRecords": "2"
            }
        });

        let envelope: ResultSetEnvelope<ProjectRecord> =
            serde_json::from_value(body).expect("valid listing");
        assert_eq!(envelope.len(), 2);
        let rows = envelope.into_rows();
        assert_eq!(rows[0].pi(), "Lovelace, Ada");
        assert_eq!(rows[1].pi(), "NONE");
    }

    #[test]
    fn experiment_modality_derives_from_xsi_type() {
        let record = ExperimentRecord {
            id: "XNAT_E0001".to_string(),
            label: "sess01".to_string(),
            project: "projA".to_string(),
            subject_id: "XNAT_S0001".to_string(),
            insert_date: String::new(),
            xsi_type: "xnat:mrSessionData".to_string(),
        };
        assert_eq!(record.modality(), "MR");

        let odd = ExperimentRecord {
            xsi_type: "xnat:subjectData".to_string(),
            ..record
        };
        assert_eq!(odd.modality(), "Unknown");
    }

    #[test]
    fn accessibility_parses_known_states_case_insensitively() {
        assert_eq!("Public".parse::<Accessibility>(), Ok(Accessibility::Public));
        assert_eq!(
            " private ".parse::<Accessibility>(),
            Ok(Accessibility::Private)
        );
        assert!("open".parse::<Accessibility>().is_err());
    }
}
