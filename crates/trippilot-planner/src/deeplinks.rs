//! Tracked affiliate deeplinks and partner search URLs.

use chrono::NaiveDate;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use trippilot_core::LinkType;
use uuid::Uuid;

const FLIGHT_SEARCH_URL: &str = "https://www.aviasales.com/search";
const HOTEL_SEARCH_URL: &str = "https://www.booking.com/searchresults.html";
const TOUR_SEARCH_URL: &str = "https://www.getyourguide.com/s/";
const PLACE_SEARCH_URL: &str = "https://www.google.com/search";

/// Provider label stamped on partner search links.
pub const SEARCH_PROVIDER: &str = "travelpayouts";

/// Unreserved characters stay literal; everything else is escaped.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Attribution attached to every outbound link.
#[derive(Debug, Clone, Copy, Default)]
pub struct Tracking<'a> {
    pub provider: &'a str,
    pub plan_id: Option<Uuid>,
    /// Component label (`flight`, `hotel`, `tour`), not [`LinkType`].
    pub link_type: Option<&'a str>,
    pub destination: Option<&'a str>,
}

/// Outcome of preferring an item URL over a search URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLink {
    pub url: String,
    pub link_type: LinkType,
    pub fallback_search: bool,
}

/// Route and dates for a flight search link.
#[derive(Debug, Clone, Copy)]
pub struct FlightSearch<'a> {
    pub origin: &'a str,
    pub destination: &'a str,
    pub depart_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub travelers: u32,
}

/// Builds tracked links; carries the affiliate marker when one is configured.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkBuilder {
    marker: Option<String>,
}

impl LinkBuilder {
    #[must_use]
    pub fn new(marker: Option<String>) -> Self {
        let marker = marker
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty());
        Self { marker }
    }

    #[must_use]
    pub fn affiliate_configured(&self) -> bool {
        self.marker.is_some()
    }

    /// Merge tracking parameters into `url`'s query string.
    ///
    /// Existing parameters are preserved; tracking keys overwrite same-named
    /// ones. Empty URLs are returned unchanged.
    #[must_use]
    pub fn tracked(&self, url: &str, tracking: &Tracking<'_>) -> String {
        let url = url.trim();
        if url.is_empty() {
            return String::new();
        }
        let mut params: Vec<(&str, String)> = vec![
            ("utm_source", "trippilot".to_string()),
            ("utm_medium", "affiliate".to_string()),
            ("utm_campaign", "country_planner".to_string()),
            ("tp_provider", tracking.provider.to_string()),
        ];
        if let Some(marker) = &self.marker {
            params.push(("affiliate_id", marker.clone()));
            params.push(("marker", marker.clone()));
        }
        if let Some(plan_id) = tracking.plan_id {
            params.push(("tp_plan", plan_id.to_string()));
        }
        if let Some(link_type) = tracking.link_type {
            params.push(("tp_link_type", link_type.to_string()));
        }
        if let Some(destination) = tracking.destination {
            params.push(("tp_destination", destination.to_string()));
        }
        merge_query(url, &params)
    }

    /// Track the item URL when present, else fall back to the search URL.
    #[must_use]
    pub fn resolve_partner(
        &self,
        item_url: Option<&str>,
        search_url: &str,
        tracking: &Tracking<'_>,
    ) -> ResolvedLink {
        match item_url.map(str::trim).filter(|u| !u.is_empty()) {
            Some(item) => ResolvedLink {
                url: self.tracked(item, tracking),
                link_type: LinkType::Item,
                fallback_search: false,
            },
            None => ResolvedLink {
                url: self.tracked(search_url, tracking),
                link_type: LinkType::Search,
                fallback_search: true,
            },
        }
    }

    /// Untracked flight search URL; pass it through [`Self::tracked`] or
    /// [`Self::resolve_partner`].
    #[must_use]
    pub fn flight_search_url(search: &FlightSearch<'_>) -> String {
        let mut params = vec![
            ("origin", search.origin.to_string()),
            ("destination", search.destination.to_string()),
            ("depart_date", search.depart_date.to_string()),
            ("adults", search.travelers.max(1).to_string()),
        ];
        if let Some(ret) = search.return_date {
            params.push(("return_date", ret.to_string()));
        }
        merge_query(FLIGHT_SEARCH_URL, &params)
    }

    /// Tracked flight search link.
    #[must_use]
    pub fn flight_search(
        &self,
        search: &FlightSearch<'_>,
        plan_id: Option<Uuid>,
        destination_label: Option<&str>,
    ) -> String {
        let raw = Self::flight_search_url(search);
        self.tracked(
            &raw,
            &Tracking {
                provider: SEARCH_PROVIDER,
                plan_id,
                link_type: Some("flight"),
                destination: destination_label,
            },
        )
    }

    /// Untracked hotel search URL. The affiliate id rides along as `aid`.
    #[must_use]
    pub fn hotel_search_url(
        &self,
        city: &str,
        country_code: &str,
        checkin: NaiveDate,
        checkout: NaiveDate,
        adults: u32,
    ) -> String {
        let mut params = vec![
            ("ss", format!("{city}, {country_code}")),
            ("checkin", checkin.to_string()),
            ("checkout", checkout.to_string()),
            ("group_adults", adults.max(1).to_string()),
            ("no_rooms", "1".to_string()),
        ];
        if let Some(marker) = &self.marker {
            params.push(("aid", marker.clone()));
        }
        merge_query(HOTEL_SEARCH_URL, &params)
    }

    /// Tracked hotel search link.
    #[must_use]
    pub fn hotel_search(
        &self,
        city: &str,
        country_code: &str,
        checkin: NaiveDate,
        checkout: NaiveDate,
        adults: u32,
        plan_id: Option<Uuid>,
    ) -> String {
        let raw = self.hotel_search_url(city, country_code, checkin, checkout, adults);
        let destination = format!("{city}-{country_code}");
        self.tracked(
            &raw,
            &Tracking {
                provider: SEARCH_PROVIDER,
                plan_id,
                link_type: Some("hotel"),
                destination: Some(&destination),
            },
        )
    }

    /// Tracked tour search link for a city.
    #[must_use]
    pub fn tour_search(&self, city: &str, country_code: &str, plan_id: Option<Uuid>) -> String {
        let raw = merge_query(TOUR_SEARCH_URL, &[("q", format!("{city} {country_code}"))]);
        let destination = format!("{city}-{country_code}");
        self.tracked(
            &raw,
            &Tracking {
                provider: SEARCH_PROVIDER,
                plan_id,
                link_type: Some("tour"),
                destination: Some(&destination),
            },
        )
    }

    /// Generic "must see" web search for a city; never tracked.
    #[must_use]
    pub fn place_search(city: &str) -> String {
        merge_query(PLACE_SEARCH_URL, &[("q", format!("{city} must see"))])
    }
}

fn encode(value: &str) -> String {
    utf8_percent_encode(value, QUERY_VALUE).to_string()
}

/// Append or replace query parameters, keeping the fragment in place.
///
/// Existing pairs are kept verbatim (already encoded); new values are encoded.
fn merge_query(url: &str, params: &[(&str, String)]) -> String {
    let (without_fragment, fragment) = match url.split_once('#') {
        Some((head, frag)) => (head, Some(frag)),
        None => (url, None),
    };
    let (base, query) = match without_fragment.split_once('?') {
        Some((head, q)) => (head, q),
        None => (without_fragment, ""),
    };

    let mut pairs: Vec<(String, String)> = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (k.to_string(), v.to_string()),
            None => (pair.to_string(), String::new()),
        })
        .collect();

    for (key, value) in params {
        if value.is_empty() {
            continue;
        }
        let encoded = encode(value);
        match pairs.iter_mut().find(|(k, _)| k == key) {
            Some(existing) => existing.1 = encoded,
            None => pairs.push(((*key).to_string(), encoded)),
        }
    }

    let mut out = String::from(base);
    if !pairs.is_empty() {
        out.push('?');
        let joined: Vec<String> = pairs.into_iter().map(|(k, v)| format!("{k}={v}")).collect();
        out.push_str(&joined.join("&"));
    }
    if let Some(frag) = fragment {
        out.push('#');
        out.push_str(frag);
    }
    out
}
