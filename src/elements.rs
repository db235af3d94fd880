use serde::{Deserialize, Serialize};
use std::fmt;
use crate::error::ElementError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Family {
    CG,
    DG,
    CR,
    Bubble,
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Family::CG => "CG",
            Family::DG => "DG",
            Family::CR => "CR",
            Family::Bubble => "Bubble",
        };
        f.write_str(name)
    }
}

/// A (family, degree) pair, serialized as `["CG", 2]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(Family, u32)", into = "(Family, u32)")]
pub struct ElementSpec {
    pub family: Family,
    pub degree: u32,
}

impl ElementSpec {
    pub const fn new(family: Family, degree: u32) -> Self {
        Self { family, degree }
    }
}

impl From<(Family, u32)> for ElementSpec {
    fn from((family, degree): (Family, u32)) -> Self {
        Self { family, degree }
    }
}

impl From<ElementSpec> for (Family, u32) {
    fn from(spec: ElementSpec) -> Self {
        (spec.family, spec.degree)
    }
}

/// Velocity and pressure elements of a mixed discretization.
///
/// The velocity element is the sum of one or more sub-elements (e.g. CG1 plus
/// a cubic bubble for the Mini element); the pressure element is a single one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawElementDescription", into = "RawElementDescription")]
pub struct ElementDescription {
    velocity: Vec<ElementSpec>,
    pressure: ElementSpec,
}

// Wire shape, `{"V": [...], "Q": [...]}`, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawElementDescription {
    #[serde(rename = "V", default)]
    velocity: Option<Vec<ElementSpec>>,
    #[serde(rename = "Q", default)]
    pressure: Option<Vec<ElementSpec>>,
}

impl ElementDescription {
    pub fn new(
        velocity: Vec<ElementSpec>,
        pressure: Vec<ElementSpec>,
    ) -> Result<Self, ElementError> {
        if velocity.is_empty() {
            return Err(ElementError::MissingVelocity);
        }
        match pressure.as_slice() {
            [single] => Ok(Self { velocity, pressure: *single }),
            other => Err(ElementError::PressureCount(other.len())),
        }
    }

    pub fn velocity(&self) -> &[ElementSpec] {
        &self.velocity
    }

    pub fn pressure(&self) -> &ElementSpec {
        &self.pressure
    }

    /// Degree of the (possibly enriched) velocity element: the largest sub-element degree.
    pub fn velocity_degree(&self) -> u32 {
        self.velocity.iter().map(|s| s.degree).max().unwrap_or(0)
    }
}

impl TryFrom<RawElementDescription> for ElementDescription {
    type Error = ElementError;

    fn try_from(raw: RawElementDescription) -> Result<Self, Self::Error> {
        let velocity = raw.velocity.ok_or(ElementError::MissingVelocity)?;
        let pressure = raw.pressure.ok_or(ElementError::PressureCount(0))?;
        Self::new(velocity, pressure)
    }
}

impl From<ElementDescription> for RawElementDescription {
    fn from(element: ElementDescription) -> Self {
        Self { velocity: Some(element.velocity), pressure: Some(vec![element.pressure]) }
    }
}

/// Named element descriptions, in a fixed order.
#[derive(Debug, Clone)]
pub struct ElementCatalog {
    entries: Vec<(String, ElementDescription)>,
}

impl ElementCatalog {
    pub fn new(entries: Vec<(String, ElementDescription)>) -> Self {
        Self { entries }
    }

    /// Taylor–Hood, the two Crouzeix–Raviart variants and the Mini element.
    pub fn standard() -> Result<Self, ElementError> {
        use Family::*;
        Ok(Self::new(vec![
            catalog_entry("taylor-hood", &[(CG, 2)], (CG, 1))?,
            catalog_entry("crouzeix-raviart-1", &[(CR, 1)], (DG, 0))?,
            catalog_entry("crouzeix-raviart-2", &[(CG, 2), (Bubble, 3)], (DG, 1))?,
            catalog_entry("mini", &[(CG, 1), (Bubble, 3)], (CG, 1))?,
        ]))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    #[cfg(test)]
    pub fn get(&self, name: &str) -> Option<&ElementDescription> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, e)| e)
    }

    /// Entry at `index`, or `None` when the index is negative or past the end.
    pub fn by_index(&self, index: i64) -> Option<(&str, &ElementDescription)> {
        let index = usize::try_from(index).ok()?;
        self.entries.get(index).map(|(n, e)| (n.as_str(), e))
    }
}

fn catalog_entry(
    name: &str,
    velocity: &[(Family, u32)],
    pressure: (Family, u32),
) -> Result<(String, ElementDescription), ElementError> {
    let velocity = velocity.iter().map(|&s| ElementSpec::from(s)).collect();
    Ok((name.to_string(), ElementDescription::new(velocity, vec![pressure.into()])?))
}
