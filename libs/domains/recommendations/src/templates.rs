//! HTML views rendered with Handlebars.
//!
//! Both pages share `layout.hbs`. Every interpolated value is HTML-escaped.

use std::sync::Arc;

use core_config::AppInfo;
use handlebars::Handlebars;
use serde::Serialize;

use crate::error::{RecommendationError, RecommendationResult};
use crate::models::{DEFAULT_RESULTS, MAX_RESULTS, MIN_RESULTS, RecommendationItem};

pub const APP_TITLE: &str = "Book Recommendation System";

const LAYOUT_TEMPLATE: &str = include_str!("../templates/layout.hbs");
const INDEX_TEMPLATE: &str = include_str!("../templates/index.hbs");
const RECOMMENDATIONS_TEMPLATE: &str = include_str!("../templates/recommendations.hbs");

#[derive(Serialize)]
struct FormContext<'a> {
    title: &'a str,
    version: &'a str,
    error: Option<&'a str>,
    min_results: i64,
    max_results: i64,
    default_results: i64,
}

#[derive(Serialize)]
struct ResultsContext<'a> {
    title: &'a str,
    version: &'a str,
    query: &'a str,
    recommendations: &'a [RecommendationItem],
}

/// The form view and the results view
#[derive(Clone)]
pub struct Views {
    handlebars: Arc<Handlebars<'static>>,
    app: AppInfo,
}

impl Views {
    pub fn new(app: AppInfo) -> RecommendationResult<Self> {
        let mut handlebars = Handlebars::new();

        handlebars
            .register_partial("layout", LAYOUT_TEMPLATE)
            .map_err(|e| RecommendationError::Template(format!("Failed to register layout: {}", e)))?;
        handlebars
            .register_template_string("index", INDEX_TEMPLATE)
            .map_err(|e| RecommendationError::Template(format!("Failed to register index: {}", e)))?;
        handlebars
            .register_template_string("recommendations", RECOMMENDATIONS_TEMPLATE)
            .map_err(|e| {
                RecommendationError::Template(format!("Failed to register recommendations: {}", e))
            })?;

        Ok(Self {
            handlebars: Arc::new(handlebars),
            app,
        })
    }

    /// Input form, optionally showing an error above it
    pub fn render_form(&self, error: Option<&str>) -> RecommendationResult<String> {
        let context = FormContext {
            title: APP_TITLE,
            version: self.app.version,
            error,
            min_results: MIN_RESULTS,
            max_results: MAX_RESULTS,
            default_results: DEFAULT_RESULTS,
        };
        Ok(self.handlebars.render("index", &context)?)
    }

    /// Results page; an empty list renders a "nothing found" message
    pub fn render_results(
        &self,
        query: &str,
        recommendations: &[RecommendationItem],
    ) -> RecommendationResult<String> {
        let context = ResultsContext {
            title: APP_TITLE,
            version: self.app.version,
            query,
            recommendations,
        };
        Ok(self.handlebars.render("recommendations", &context)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn views() -> Views {
        Views::new(AppInfo {
            name: "shelf",
            version: "1.0.0",
            description: "test",
        })
        .unwrap()
    }

    #[test]
    fn test_form_without_error() {
        let html = views().render_form(None).unwrap();
        assert!(html.contains(r#"action="/recommendations""#));
        assert!(html.contains(APP_TITLE));
        assert!(!html.contains("alert-error"));
    }

    #[test]
    fn test_form_shows_error() {
        let html = views()
            .render_form(Some("Error getting recommendations: index offline"))
            .unwrap();
        assert!(html.contains("Error getting recommendations: index offline"));
    }

    #[test]
    fn test_results_keep_order() {
        let items = vec![
            RecommendationItem {
                title: "The Case".to_string(),
                description: "A detective story...".to_string(),
            },
            RecommendationItem {
                title: "Unknown Title".to_string(),
                description: "A thriller...".to_string(),
            },
        ];
        let html = views().render_results("mystery novel", &items).unwrap();

        let first = html.find("The Case").unwrap();
        let second = html.find("Unknown Title").unwrap();
        assert!(first < second);
        assert!(html.contains("mystery novel"));
    }

    #[test]
    fn test_results_empty_state() {
        let html = views().render_results("nothing", &[]).unwrap();
        assert!(html.contains("No matching books were found"));
        assert!(!html.contains("book-list"));
    }

    #[test]
    fn test_values_are_escaped() {
        let items = vec![RecommendationItem {
            title: "<script>alert(1)</script>".to_string(),
            description: "Tom & Jerry".to_string(),
        }];
        let html = views().render_results("<b>bold</b>", &items).unwrap();
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("Tom &amp; Jerry"));
        assert!(!html.contains("<b>bold</b>"));
    }
}
