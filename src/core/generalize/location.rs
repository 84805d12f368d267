//! Address to region/country reduction

/// Coarse location derived from explicit columns or a free-text address
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    /// Country
    pub country: Option<String>,
    /// Region or district
    pub region: Option<String>,
}

impl Location {
    /// Parses a comma-separated address
    ///
    /// The last component is the country and the one before it the region. A
    /// single component is taken as a region with no country.
    pub fn from_address(address: &str) -> Self {
        let parts: Vec<&str> = address
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect();

        match parts.as_slice() {
            [] => Self::default(),
            [region] => Self {
                country: None,
                region: Some((*region).to_string()),
            },
            [.., region, country] => Self {
                country: Some((*country).to_string()),
                region: Some((*region).to_string()),
            },
        }
    }

    /// Explicit columns win; missing parts are filled from the address
    pub fn resolve(country: Option<&str>, region: Option<&str>, address: Option<&str>) -> Self {
        let parsed = address.map(Self::from_address).unwrap_or_default();
        let clean = |value: Option<&str>| {
            value
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        Self {
            country: clean(country).or(parsed.country),
            region: clean(region).or(parsed.region),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_address() {
        let location = Location::from_address("Plot 4, Kololo, Kampala, Uganda");
        assert_eq!(location.country.as_deref(), Some("Uganda"));
        assert_eq!(location.region.as_deref(), Some("Kampala"));
    }

    #[test]
    fn test_single_component_is_region() {
        let location = Location::from_address("Gulu");
        assert_eq!(location.country, None);
        assert_eq!(location.region.as_deref(), Some("Gulu"));
    }

    #[test]
    fn test_empty_components_ignored() {
        let location = Location::from_address(" , Mbarara, , Uganda ");
        assert_eq!(location.country.as_deref(), Some("Uganda"));
        assert_eq!(location.region.as_deref(), Some("Mbarara"));
        assert_eq!(Location::from_address(""), Location::default());
    }

    #[test]
    fn test_explicit_columns_win() {
        let location = Location::resolve(Some("Kenya"), None, Some("Kololo, Kampala, Uganda"));
        assert_eq!(location.country.as_deref(), Some("Kenya"));
        assert_eq!(location.region.as_deref(), Some("Kampala"));
    }
}
