//! Service regions and their base URLs

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::str::FromStr;

/// Regions hosting an independent deployment of the collection API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    AwsEuCentral1,
    AwsUsWest2,
    Mundi,
}

impl Region {
    /// Every known region
    pub const ALL: [Region; 3] = [Region::AwsEuCentral1, Region::AwsUsWest2, Region::Mundi];

    /// Identifier used by the service in the `location` field
    pub fn as_str(&self) -> &'static str {
        match self {
            Region::AwsEuCentral1 => "aws-eu-central-1",
            Region::AwsUsWest2 => "aws-us-west-2",
            Region::Mundi => "mundi",
        }
    }

    fn default_base_url(&self) -> &'static str {
        match self {
            Region::AwsEuCentral1 => "https://services.sentinel-hub.com/api/v1/byoc",
            Region::AwsUsWest2 => "https://services-uswest2.sentinel-hub.com/api/v1/byoc",
            Region::Mundi => "https://shservices.mundiwebservices.com/api/v1/byoc",
        }
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Region {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Region::ALL
            .into_iter()
            .find(|region| region.as_str() == s)
            .ok_or_else(|| Error::UnknownRegion(s.to_string()))
    }
}

/// Maps each region to the base URL of its collection API
#[derive(Debug, Clone)]
pub struct EndpointRegistry {
    endpoints: HashMap<Region, String>,
}

impl Default for EndpointRegistry {
    fn default() -> Self {
        let endpoints = Region::ALL
            .into_iter()
            .map(|region| (region, region.default_base_url().to_string()))
            .collect();
        Self { endpoints }
    }
}

impl EndpointRegistry {
    /// Registry with no endpoints; every lookup fails until regions are added
    pub fn empty() -> Self {
        Self {
            endpoints: HashMap::new(),
        }
    }

    /// Replace the base URL of one region
    pub fn with_endpoint(mut self, region: Region, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        self.endpoints
            .insert(region, base_url.trim_end_matches('/').to_string());
        self
    }

    /// Base URL for `region`
    pub fn base_url(&self, region: Region) -> Result<&str> {
        self.endpoints
            .get(&region)
            .map(String::as_str)
            .ok_or_else(|| Error::UnknownRegion(region.to_string()))
    }

    /// Base URL for a region given by identifier
    pub fn base_url_for(&self, location: &str) -> Result<&str> {
        self.base_url(location.parse()?)
    }

    /// Configured regions and their URLs, in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (Region, &str)> {
        Region::ALL
            .into_iter()
            .filter_map(|region| self.endpoints.get(&region).map(|url| (region, url.as_str())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_round_trips_through_identifier() {
        for region in Region::ALL {
            assert_eq!(region.as_str().parse::<Region>().unwrap(), region);
        }
    }

    #[test]
    fn test_unknown_region_identifier() {
        let err = "aws-ap-south-1".parse::<Region>().unwrap_err();
        assert!(matches!(err, Error::UnknownRegion(ref r) if r == "aws-ap-south-1"));
    }

    #[test]
    fn test_default_registry_urls() {
        let registry = EndpointRegistry::default();
        assert_eq!(
            registry.base_url(Region::AwsUsWest2).unwrap(),
            "https://services-uswest2.sentinel-hub.com/api/v1/byoc"
        );
        assert_eq!(
            registry.base_url_for("mundi").unwrap(),
            "https://shservices.mundiwebservices.com/api/v1/byoc"
        );
    }

    #[test]
    fn test_override_trims_trailing_slash() {
        let registry =
            EndpointRegistry::default().with_endpoint(Region::Mundi, "http://localhost:9000/byoc/");
        assert_eq!(
            registry.base_url(Region::Mundi).unwrap(),
            "http://localhost:9000/byoc"
        );
    }

    #[test]
    fn test_missing_endpoint_is_unknown_region() {
        let registry = EndpointRegistry::empty().with_endpoint(Region::Mundi, "http://a");
        assert!(matches!(
            registry.base_url(Region::AwsEuCentral1),
            Err(Error::UnknownRegion(_))
        ));
        assert_eq!(registry.iter().count(), 1);
    }
}
