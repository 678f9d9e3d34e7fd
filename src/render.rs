//! Page rendering
//!
//! Turns tab plans into the published file set: one page per route plus an
//! index. Rendering is a pure function of its inputs. The caller supplies
//! the generation timestamp, so identical inputs give byte-identical pages.

use askama::Template;
use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::config::PublishConfig;
use crate::plan::{open_plan_for_route, TabPlanEntry};
use crate::routes::RouteId;
use crate::store::ArtifactSet;
use crate::window::ScheduleWindow;

pub const INDEX_PATH: &str = "index.html";

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Route {route:?} maps to reserved path {path}")]
    ReservedPath { route: String, path: String },
}

#[derive(Template)]
#[template(path = "route_page.html")]
struct RoutePage<'a> {
    route: &'a str,
    labels_json: String,
    urls_json: String,
    delays_json: String,
    start_date: String,
    end_date: String,
    zone_name: &'a str,
}

struct IndexLink {
    href: String,
    name: String,
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexPage<'a> {
    generated_at: &'a str,
    range_hint: &'a str,
    links: Vec<IndexLink>,
}

/// JSON for inline `<script>` use. Angle brackets only occur inside JSON
/// strings, so emitting them as `\u003c`/`\u003e` keeps the value intact
/// while no `</script` or `<!--` can reach the HTML parser.
fn script_json<T: Serialize + ?Sized>(value: &T) -> Result<String, RenderError> {
    Ok(serde_json::to_string(value)?
        .replace('<', "\\u003c")
        .replace('>', "\\u003e"))
}

/// Render one route page from its plan.
pub fn route_page_html(
    route: &RouteId,
    plan: &[TabPlanEntry],
    window: &ScheduleWindow,
    config: &PublishConfig,
) -> Result<String, RenderError> {
    let labels: Vec<&str> = plan.iter().map(|e| e.label.as_str()).collect();
    let urls: Vec<&str> = plan.iter().map(|e| e.url.as_str()).collect();
    let delays: Vec<u64> = plan.iter().map(|e| e.delay_ms).collect();

    let page = RoutePage {
        route: route.as_str(),
        labels_json: script_json(&labels)?,
        urls_json: script_json(&urls)?,
        delays_json: script_json(&delays)?,
        start_date: window.start().format("%Y-%m-%d").to_string(),
        end_date: window.end().format("%Y-%m-%d").to_string(),
        zone_name: config.timezone.name(),
    };
    Ok(page.render()?)
}

/// Render the index page linking every route page.
pub fn index_html(
    routes: &[RouteId],
    generated_at: &str,
    range_hint: &str,
    config: &PublishConfig,
) -> Result<String, RenderError> {
    let links = routes
        .iter()
        .map(|r| IndexLink {
            href: config.output_path(&r.page_file_name()),
            name: r.to_string(),
        })
        .collect();

    let page = IndexPage {
        generated_at,
        range_hint,
        links,
    };
    Ok(page.render()?)
}

/// Reject routes whose page would overwrite one of the `reserved` paths.
pub fn check_reserved_paths(
    routes: &[RouteId],
    config: &PublishConfig,
    reserved: &[&str],
) -> Result<(), RenderError> {
    for route in routes {
        let path = config.output_path(&route.page_file_name());
        if reserved.contains(&path.as_str()) {
            return Err(RenderError::ReservedPath {
                route: route.to_string(),
                path,
            });
        }
    }
    Ok(())
}

/// Build every route page and the index. The success marker is not part
/// of this set; the pipeline adds it once rendering has succeeded.
pub fn assemble(
    routes: &[RouteId],
    window: &ScheduleWindow,
    reference_day: NaiveDate,
    generated_at: &str,
    config: &PublishConfig,
) -> Result<ArtifactSet, RenderError> {
    check_reserved_paths(routes, config, &[INDEX_PATH, config.state_path.as_str()])?;
    let mut artifacts = ArtifactSet::new();

    for route in routes {
        let plan = open_plan_for_route(route, window, reference_day);
        let html = route_page_html(route, &plan, window, config)?;
        artifacts.insert(config.output_path(&route.page_file_name()), html);
    }

    artifacts.insert(
        INDEX_PATH,
        index_html(routes, generated_at, &window.range_hint(), config)?,
    );
    Ok(artifacts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::parse_route_list;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn window() -> ScheduleWindow {
        ScheduleWindow::new(date(2024, 6, 1), date(2024, 6, 3)).unwrap()
    }

    #[test]
    fn test_assemble_paths() {
        let routes = parse_route_list("24\nN 29\n").unwrap();
        let set = assemble(
            &routes,
            &window(),
            date(2024, 6, 1),
            "2024-06-01 09:00 BST",
            &PublishConfig::default(),
        )
        .unwrap();

        let paths: Vec<&str> = set.paths().collect();
        assert_eq!(paths, vec!["24.html", "N_29.html", "index.html"]);
    }

    #[test]
    fn test_assemble_with_target_dir() {
        let routes = parse_route_list("24\n").unwrap();
        let config = PublishConfig {
            target_dir: "routes".to_string(),
            ..PublishConfig::default()
        };
        let set = assemble(&routes, &window(), date(2024, 6, 1), "now", &config).unwrap();
        assert!(set.contains("routes/24.html"));
        assert!(set.get(INDEX_PATH).unwrap().contains("href=\"routes"));
    }

    #[test]
    fn test_route_page_embeds_plan() {
        let routes = parse_route_list("24\n").unwrap();
        let set = assemble(
            &routes,
            &window(),
            date(2024, 6, 1),
            "now",
            &PublishConfig::default(),
        )
        .unwrap();
        let page = set.get("24.html").unwrap();

        assert!(page.contains("<title>Route 24</title>"));
        assert!(page.contains("const delays = [0,60,200,260,550,610,900,960,1450,1510];"));
        assert!(page.contains("\"Now — inbound\""));
        assert!(page.contains("dateTypeSelect=This%20weekend"));
        assert!(page.contains("Date range: 2024-06-01 &rarr; 2024-06-03"));
        assert!(page.contains("id=\"plannedList\""));
    }

    #[test]
    fn test_index_lists_routes_in_order() {
        let routes = parse_route_list("SL10\n24\n").unwrap();
        let html = index_html(
            &routes,
            "2024-06-01 09:00 BST",
            "2024-06-01 → 2024-06-13",
            &PublishConfig::default(),
        )
        .unwrap();

        let sl10 = html.find("SL10.html").unwrap();
        let r24 = html.find("24.html").unwrap();
        assert!(sl10 < r24);
        assert!(html.contains("Generated: <strong>2024-06-01 09:00 BST</strong>"));
        assert!(html.contains("Total routes: <strong>2</strong>"));
    }

    #[test]
    fn test_route_id_is_escaped() {
        let routes = parse_route_list("<b>x</script>\n").unwrap();
        let set = assemble(
            &routes,
            &window(),
            date(2024, 6, 1),
            "now",
            &PublishConfig::default(),
        )
        .unwrap();

        let page = set.get("_b_x_script_.html").unwrap();
        assert!(page.contains("Route &lt;b&gt;x&lt;"));
        assert!(!page.contains("x</script>"));
        assert!(page.contains("input=\\u003cb\\u003ex\\u003c/script\\u003e"));
        assert!(!set.get(INDEX_PATH).unwrap().contains("<b>x"));
    }

    #[test]
    fn test_comment_open_in_route_stays_inside_script_data() {
        let routes = parse_route_list("<!--24\n").unwrap();
        let set = assemble(
            &routes,
            &window(),
            date(2024, 6, 1),
            "now",
            &PublishConfig::default(),
        )
        .unwrap();

        let page = set.get("_--24.html").unwrap();
        assert!(!page.contains("<!--"));
        assert!(page.contains("\"Now — inbound\""));
        assert!(page.contains("input=\\u003c!--24"));
    }

    #[test]
    fn test_route_on_index_path_is_rejected() {
        let routes = parse_route_list("24\nindex\n").unwrap();
        let err = assemble(
            &routes,
            &window(),
            date(2024, 6, 1),
            "now",
            &PublishConfig::default(),
        )
        .unwrap_err();
        match err {
            RenderError::ReservedPath { route, path } => {
                assert_eq!(route, "index");
                assert_eq!(path, INDEX_PATH);
            }
            other => panic!("expected reserved path error, got {other}"),
        }

        // Under a target directory the page no longer shadows the index.
        let config = PublishConfig {
            target_dir: "routes".to_string(),
            ..PublishConfig::default()
        };
        let set = assemble(&routes, &window(), date(2024, 6, 1), "now", &config).unwrap();
        assert!(set.contains("routes/index.html"));
        assert!(set.get(INDEX_PATH).unwrap().contains("Total routes: <strong>2</strong>"));
    }

    #[test]
    fn test_route_on_state_path_is_rejected() {
        let routes = parse_route_list("24\nstate\n").unwrap();
        let config = PublishConfig {
            state_path: "state.html".to_string(),
            ..PublishConfig::default()
        };
        let err = assemble(&routes, &window(), date(2024, 6, 1), "now", &config).unwrap_err();
        assert!(matches!(err, RenderError::ReservedPath { ref path, .. } if path == "state.html"));
    }

    #[test]
    fn test_assemble_is_deterministic() {
        let routes = parse_route_list("24\nN29\nSL10\n").unwrap();
        let config = PublishConfig::default();
        let a = assemble(&routes, &window(), date(2024, 6, 1), "t", &config).unwrap();
        let b = assemble(&routes, &window(), date(2024, 6, 1), "t", &config).unwrap();
        assert_eq!(a, b);
    }
}
