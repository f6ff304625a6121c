use serde::Deserialize;

use super::{ExternalMovie, SearchPreview, SearchResults};
use crate::models::ContentType;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Genre {
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Creator {
    pub name: Option<String>,
}

/// `/movie/{id}` payload, limited to the fields the catalog reads.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MovieDetail {
    pub id: i64,
    pub title: Option<String>,
    pub original_title: Option<String>,
    pub original_language: Option<String>,
    pub release_date: Option<String>,
    pub genres: Vec<Genre>,
    pub vote_average: Option<f64>,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
}

/// `/tv/{id}` payload, limited to the fields the catalog reads.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TvDetail {
    pub id: i64,
    pub name: Option<String>,
    pub original_name: Option<String>,
    pub original_language: Option<String>,
    pub first_air_date: Option<String>,
    pub created_by: Vec<Creator>,
    pub genres: Vec<Genre>,
    pub vote_average: Option<f64>,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchItem {
    pub id: i64,
    pub title: Option<String>,
    pub original_title: Option<String>,
    pub name: Option<String>,
    pub original_name: Option<String>,
    pub release_date: Option<String>,
    pub first_air_date: Option<String>,
    pub poster_path: Option<String>,
    pub overview: Option<String>,
    pub vote_average: Option<f64>,
}

/// `/search/movie` and `/search/tv` envelope.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchPage {
    pub results: Vec<SearchItem>,
    pub page: Option<u32>,
    pub total_results: Option<u64>,
    pub total_pages: Option<u32>,
}

pub fn movie_from_detail(detail: MovieDetail, image_base_url: &str) -> ExternalMovie {
    let director = extract_director(&detail);
    ExternalMovie {
        tmdb_id: detail.id,
        title: detail.title.unwrap_or_default(),
        original_title: detail.original_title,
        original_language: detail.original_language,
        year: parse_year(detail.release_date.as_deref()),
        director,
        genres: genre_names(detail.genres),
        rating: round_rating(detail.vote_average),
        description: detail.overview,
        poster_url: poster_url(image_base_url, detail.poster_path.as_deref()),
        content_type: ContentType::Movie,
    }
}

pub fn movie_from_tv(detail: TvDetail, image_base_url: &str) -> ExternalMovie {
    let director = detail
        .created_by
        .into_iter()
        .next()
        .and_then(|c| c.name)
        .unwrap_or_default();
    ExternalMovie {
        tmdb_id: detail.id,
        title: detail.name.unwrap_or_default(),
        original_title: detail.original_name,
        original_language: detail.original_language,
        year: parse_year(detail.first_air_date.as_deref()),
        director,
        genres: genre_names(detail.genres),
        rating: round_rating(detail.vote_average),
        description: detail.overview,
        poster_url: poster_url(image_base_url, detail.poster_path.as_deref()),
        content_type: ContentType::Series,
    }
}

pub fn format_search_results(
    page: SearchPage,
    content_type: ContentType,
    image_base_url: &str,
) -> SearchResults {
    let results = page
        .results
        .into_iter()
        .map(|item| {
            let poster_path = poster_url(image_base_url, item.poster_path.as_deref());
            let (title, original_title, release_date) = match content_type {
                ContentType::Movie => (item.title, item.original_title, item.release_date),
                ContentType::Series => (item.name, item.original_name, item.first_air_date),
            };
            SearchPreview {
                tmdb_id: item.id,
                title: title.unwrap_or_default(),
                original_title: original_title.unwrap_or_default(),
                release_date: release_date.unwrap_or_default(),
                poster_path,
                overview: item.overview.unwrap_or_default(),
                vote_average: item.vote_average.unwrap_or(0.0),
                content_type,
            }
        })
        .collect();

    SearchResults {
        results,
        total_results: page.total_results.unwrap_or(0),
        page: page.page.unwrap_or(1),
        total_pages: page.total_pages.unwrap_or(0),
    }
}

// Movie details carry no crew; resolving a director needs the credits
// endpoint, which is not queried yet.
fn extract_director(_detail: &MovieDetail) -> String {
    String::new()
}

fn parse_year(date: Option<&str>) -> Option<i32> {
    date.filter(|d| !d.is_empty())
        .and_then(|d| d.get(..4))
        .and_then(|y| y.parse().ok())
}

fn genre_names(genres: Vec<Genre>) -> Vec<String> {
    genres.into_iter().map(|g| g.name).collect()
}

fn round_rating(vote_average: Option<f64>) -> f64 {
    (vote_average.unwrap_or(0.0) * 10.0).round() / 10.0
}

fn poster_url(image_base_url: &str, poster_path: Option<&str>) -> Option<String> {
    poster_path
        .filter(|p| !p.is_empty())
        .map(|p| format!("{image_base_url}{p}"))
}
