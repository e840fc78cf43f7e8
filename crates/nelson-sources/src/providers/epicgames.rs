//! Epic Games Store free-games promotions.
//!
//! One offer can yield two records: one while it is free and one announcing
//! an upcoming free period. The status is part of the native id, so the two
//! never collide in the dedup store.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use nelson_core::{Provider, RawRecord};
use serde::Deserialize;

use crate::error::SourceError;
use crate::fetcher::HttpFetcher;
use crate::provider::SourceProvider;

const API_URL: &str = "https://store-site-backend-static.ak.epicgames.com/freeGamesPromotions";
const PRODUCT_BASE: &str = "https://store.epicgames.com/ru/p/";
const FREE_GAMES_PAGE: &str = "https://store.epicgames.com/ru/free-games";
const FREE_CATEGORY: &str = "freegames";
const DEFAULT_WINDOW_DAYS: i64 = 7;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct PromotionsResponse {
    #[serde(default)]
    data: Option<ResponseData>,
    #[serde(default)]
    errors: Vec<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ResponseData {
    #[serde(rename = "Catalog")]
    catalog: Catalog,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Catalog {
    search_store: SearchStore,
}

#[derive(Debug, Deserialize)]
struct SearchStore {
    #[serde(default)]
    elements: Vec<Offer>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct Offer {
    title: String,
    id: String,
    description: String,
    offer_type: String,
    effective_date: Option<String>,
    expiry_date: Option<String>,
    key_images: Vec<KeyImage>,
    price: Option<Price>,
    promotions: Option<Promotions>,
    categories: Vec<Category>,
    product_slug: Option<String>,
    url_slug: Option<String>,
}

#[derive(Debug, Deserialize)]
struct KeyImage {
    #[serde(rename = "type")]
    kind: String,
    url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Price {
    total_price: TotalPrice,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct TotalPrice {
    discount_price: i64,
    original_price: i64,
    fmt_price: FmtPrice,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct FmtPrice {
    original_price: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct Promotions {
    promotional_offers: Vec<PromotionGroup>,
    upcoming_promotional_offers: Vec<PromotionGroup>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct PromotionGroup {
    promotional_offers: Vec<Promotion>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Promotion {
    start_date: String,
    end_date: String,
    discount_setting: DiscountSetting,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DiscountSetting {
    discount_type: String,
    #[serde(default)]
    discount_percentage: i64,
}

#[derive(Debug, Deserialize)]
struct Category {
    path: String,
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

pub struct EpicGamesSource {
    fetcher: HttpFetcher,
    url: String,
}

impl EpicGamesSource {
    #[must_use]
    pub fn new(fetcher: HttpFetcher) -> Self {
        Self::with_url(fetcher, API_URL)
    }

    #[must_use]
    pub fn with_url(fetcher: HttpFetcher, url: impl Into<String>) -> Self {
        Self {
            fetcher,
            url: url.into(),
        }
    }
}

#[async_trait]
impl SourceProvider for EpicGamesSource {
    fn provider(&self) -> Provider {
        Provider::EpicGames
    }

    async fn fetch(&self) -> Result<Vec<RawRecord>, SourceError> {
        let response: PromotionsResponse = self
            .fetcher
            .get_json(&self.url, "epic games promotions")
            .await?;
        Ok(records_from_response(response, Utc::now()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    FreeNow,
    FreeSoon,
}

impl Status {
    fn key(self) -> &'static str {
        match self {
            Status::FreeNow => "free-now",
            Status::FreeSoon => "free-soon",
        }
    }
}

type Window = (DateTime<Utc>, DateTime<Utc>);

/// Turn a promotions payload into records as seen at `now`.
#[cfg(test)]
pub(crate) fn parse_promotions(
    json: &str,
    now: DateTime<Utc>,
) -> Result<Vec<RawRecord>, SourceError> {
    let response: PromotionsResponse =
        serde_json::from_str(json).map_err(|source| SourceError::Json {
            context: "epic games promotions".to_string(),
            source,
        })?;
    Ok(records_from_response(response, now))
}

fn records_from_response(response: PromotionsResponse, now: DateTime<Utc>) -> Vec<RawRecord> {
    if !response.errors.is_empty() {
        let messages: Vec<&str> = response.errors.iter().map(|e| e.message.as_str()).collect();
        tracing::warn!(
            provider = %Provider::EpicGames,
            errors = ?messages,
            "epicgames: API returned errors alongside data"
        );
    }

    let offers = response
        .data
        .map(|d| d.catalog.search_store.elements)
        .unwrap_or_default();

    let mut records = Vec::new();
    for offer in offers.iter().filter(|o| is_eligible(o)) {
        if let Some(window) = free_now_window(offer, now) {
            records.push(build_record(offer, Status::FreeNow, window));
        }
        if let Some(window) = upcoming_window(offer, now) {
            records.push(build_record(offer, Status::FreeSoon, window));
        }
    }
    records
}

fn is_eligible(offer: &Offer) -> bool {
    matches!(offer.offer_type.as_str(), "BASE_GAME" | "ADD_ON" | "BUNDLE")
        && offer.categories.iter().any(|c| c.path == FREE_CATEGORY)
}

fn prices(offer: &Offer) -> (i64, i64) {
    offer
        .price
        .as_ref()
        .map_or((0, 0), |p| (p.total_price.original_price, p.total_price.discount_price))
}

fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => Some(dt.with_timezone(&Utc)),
        Err(e) => {
            tracing::warn!(value = raw, error = %e, "epicgames: unparseable promotion date");
            None
        }
    }
}

fn promotion_window(promotion: &Promotion) -> Option<Window> {
    Some((
        parse_date(&promotion.start_date)?,
        parse_date(&promotion.end_date)?,
    ))
}

fn is_free_discount(setting: &DiscountSetting) -> bool {
    setting.discount_type == "PERCENTAGE"
        && (setting.discount_percentage == 0 || setting.discount_percentage == 100)
}

fn default_window(now: DateTime<Utc>) -> Window {
    (now, now + Duration::days(DEFAULT_WINDOW_DAYS))
}

fn free_now_window(offer: &Offer, now: DateTime<Utc>) -> Option<Window> {
    let (original, discounted) = prices(offer);
    let discounted_to_zero = original > 0 && discounted == 0;

    let active = offer
        .promotions
        .as_ref()
        .map(|p| p.promotional_offers.as_slice())
        .unwrap_or_default();

    if active.is_empty() {
        return (original == 0 || discounted_to_zero).then(|| default_window(now));
    }

    let promoted = active
        .iter()
        .flat_map(|group| &group.promotional_offers)
        .find_map(|promotion| {
            let (start, end) = promotion_window(promotion)?;
            let running = now > start && now < end;
            let free = promotion.discount_setting.discount_type == "PERCENTAGE"
                && (is_free_discount(&promotion.discount_setting) || discounted == 0);
            (running && free).then_some((start, end))
        });

    promoted.or_else(|| discounted_to_zero.then(|| default_window(now)))
}

fn upcoming_window(offer: &Offer, now: DateTime<Utc>) -> Option<Window> {
    if offer.offer_type == "ADD_ON" {
        let expiry = offer.expiry_date.as_deref().and_then(parse_date);
        let effective = offer.effective_date.as_deref().and_then(parse_date);
        if let (Some(effective), Some(expiry)) = (effective, expiry) {
            if expiry > now && effective > now {
                return Some((effective, expiry));
            }
        }
    }

    offer
        .promotions
        .as_ref()?
        .upcoming_promotional_offers
        .iter()
        .flat_map(|group| &group.promotional_offers)
        .find_map(|promotion| {
            let (start, end) = promotion_window(promotion)?;
            (start > now && is_free_discount(&promotion.discount_setting)).then_some((start, end))
        })
}

fn offer_kind(offer_type: &str) -> &'static str {
    match offer_type {
        "BASE_GAME" => "Game",
        "ADD_ON" => "Add-on",
        "BUNDLE" => "Bundle",
        _ => "Content",
    }
}

fn image_for(offer: &Offer) -> Option<&str> {
    ["OfferImageTall", "OfferImageWide", "Thumbnail"]
        .iter()
        .find_map(|kind| offer.key_images.iter().find(|img| img.kind == *kind))
        .map(|img| img.url.as_str())
        .filter(|url| !url.is_empty())
}

fn link_for(offer: &Offer) -> String {
    let usable = |slug: &Option<String>| {
        slug.as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty() && *s != "null")
            .map(str::to_string)
    };
    usable(&offer.product_slug)
        .or_else(|| usable(&offer.url_slug))
        .map_or_else(
            || FREE_GAMES_PAGE.to_string(),
            |slug| format!("{PRODUCT_BASE}{slug}"),
        )
}

fn build_record(offer: &Offer, status: Status, (start, end): Window) -> RawRecord {
    let kind = offer_kind(&offer.offer_type);
    let period = format!("{} - {}", start.format("%d.%m.%Y"), end.format("%d.%m.%Y"));
    let (original, discounted) = prices(offer);

    let (title, availability, show_price) = match status {
        Status::FreeNow => (
            format!("{kind} {} is free on Epic Games Store", offer.title),
            format!("{kind} is free during: {period}"),
            original > 0 && discounted == 0,
        ),
        Status::FreeSoon => (
            format!("{kind} {} will soon be free on Epic Games Store", offer.title),
            format!("{kind} will be free during: {period}"),
            original > 0,
        ),
    };

    let mut description = format!("{}\n\n{availability}", offer.description);
    if show_price {
        if let Some(price) = offer.price.as_ref() {
            description.push_str(&format!(
                "\n\nRegular price: {}",
                price.total_price.fmt_price.original_price
            ));
        }
    }

    let mut record = RawRecord::new(Provider::EpicGames, title, link_for(offer));
    record.native_id = Some(format!("{}:{}", offer.id, status.key()));
    record.description = description;
    record.images.extend(image_for(offer).map(str::to_string));
    record
}

#[cfg(test)]
#[path = "epicgames_test.rs"]
mod tests;
