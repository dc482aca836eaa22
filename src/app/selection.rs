//! Picks which device log files to pull.
//!
//! Log names look like `<service>.<a>.<b>.<seq>.<rest>`: the fourth dot-separated segment, when
//! it is all digits, is the file's sequence id. Names without one are never ranked.
//!
//! Two policies exist and they intentionally disagree:
//! - one service: keep every file whose id is above `max_id - count`, in listing order;
//! - several services: keep the `count` highest ids per service, highest first.

use std::collections::HashSet;

const PDLOG_MARKER: &str = "pdlog";

/// The fourth dot-separated segment as a number.
///
/// Ids must fit in `u64`; a longer digit run is treated like a non-numeric segment and the
/// file is left unranked rather than compared with wrapped or truncated values.
pub fn parse_sequence_id(name: &str) -> Option<u64> {
    let segment = name.split('.').nth(3)?;
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok()
}

/// Keeps names whose id is strictly greater than `max_id - count`, preserving input order.
///
/// `count` is a breadth over the id range, not an output size: dense or repeated ids can
/// return more than `count` names, sparse ids fewer.
pub fn select_by_threshold<S: AsRef<str>>(filenames: &[S], count: i64) -> Vec<String> {
    let ids: Vec<(u64, &str)> = filenames
        .iter()
        .filter_map(|name| {
            let name = name.as_ref();
            parse_sequence_id(name).map(|id| (id, name))
        })
        .collect();
    let Some(max_id) = ids.iter().map(|(id, _)| *id).max() else {
        return Vec::new();
    };
    let threshold = i128::from(max_id) - i128::from(count);
    ids.into_iter()
        .filter(|(id, _)| i128::from(*id) > threshold)
        .map(|(_, name)| name.to_string())
        .collect()
}

/// The `count` highest-id names, highest first. Equal ids keep their listing order.
pub fn select_top_n<S: AsRef<str>>(filenames: &[S], count: i64) -> Vec<String> {
    let mut candidates: Vec<(u64, &str)> = filenames
        .iter()
        .filter_map(|name| {
            let name = name.as_ref();
            parse_sequence_id(name).map(|id| (id, name))
        })
        .collect();
    // sort_by is stable
    candidates.sort_by(|a, b| b.0.cmp(&a.0));
    let take = usize::try_from(count.max(0)).unwrap_or(usize::MAX);
    candidates
        .into_iter()
        .take(take)
        .map(|(_, name)| name.to_string())
        .collect()
}

/// Runs one policy per service and unions the results, first occurrence wins.
///
/// Prefix matching is case-sensitive. A single service uses the threshold policy, more than
/// one uses top-N.
pub fn select_logs<F: AsRef<str>, S: AsRef<str>>(
    all_filenames: &[F],
    service_names: &[S],
    count: i64,
) -> Vec<String> {
    if service_names.is_empty() {
        return Vec::new();
    }
    let multiple = service_names.len() > 1;
    let mut seen = HashSet::new();
    let mut selected = Vec::new();
    for service in service_names {
        let service = service.as_ref();
        let service_files: Vec<&str> = all_filenames
            .iter()
            .map(|name| name.as_ref())
            .filter(|name| name.starts_with(service))
            .collect();
        let chosen = if multiple {
            select_top_n(&service_files, count)
        } else {
            select_by_threshold(&service_files, count)
        };
        for name in chosen {
            if seen.insert(name.clone()) {
                selected.push(name);
            }
        }
    }
    selected
}

/// How the user picked services, before expansion against the known list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceChoice {
    All,
    None,
    Single(String),
    /// An explicit multi-selection; overrides any single choice.
    Multi(Vec<String>),
}

impl ServiceChoice {
    /// `all` and `none` are matched case-insensitively; anything else names one service.
    pub fn parse(single: &str, multi: &[String]) -> Self {
        let multi: Vec<String> = multi
            .iter()
            .map(|svc| svc.trim())
            .filter(|svc| !svc.is_empty())
            .map(str::to_string)
            .collect();
        if !multi.is_empty() {
            return Self::Multi(multi);
        }
        let single = single.trim();
        if single.eq_ignore_ascii_case("all") {
            Self::All
        } else if single.is_empty() || single.eq_ignore_ascii_case("none") {
            Self::None
        } else {
            Self::Single(single.to_string())
        }
    }
}

/// The selection engine with its service list fixed at construction.
#[derive(Debug, Clone)]
pub struct LogSelector {
    known_services: Vec<String>,
}

impl LogSelector {
    pub fn new(known_services: Vec<String>) -> Self {
        Self { known_services }
    }

    pub fn known_services(&self) -> &[String] {
        &self.known_services
    }

    pub fn resolve_services(&self, choice: &ServiceChoice) -> Vec<String> {
        match choice {
            ServiceChoice::All => self.known_services.clone(),
            ServiceChoice::None => Vec::new(),
            ServiceChoice::Single(service) => vec![service.clone()],
            ServiceChoice::Multi(services) => services.clone(),
        }
    }

    /// Candidate list for manual picking: `pdlog` files of the chosen services, sorted by name.
    ///
    /// Unlike selection, matching here ignores case. Choosing `all` lists every `pdlog` file,
    /// including ones that belong to no known service.
    pub fn browse(&self, files: &[String], choice: &ServiceChoice) -> Vec<String> {
        let services: Vec<String> = self
            .resolve_services(choice)
            .iter()
            .map(|svc| svc.to_lowercase())
            .collect();
        let any_service = matches!(choice, ServiceChoice::All);

        let mut seen = HashSet::new();
        let mut candidates: Vec<String> = files
            .iter()
            .filter(|name| {
                let lower = name.to_lowercase();
                lower.contains(PDLOG_MARKER)
                    && (any_service || services.iter().any(|svc| lower.starts_with(svc.as_str())))
            })
            .filter(|name| seen.insert(name.as_str()))
            .cloned()
            .collect();
        candidates.sort();
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn svc_a_files() -> Vec<String> {
        names(&["svcA.1.2.10.log", "svcA.1.2.15.log", "svcA.1.2.20.log"])
    }

    #[test]
    fn parses_fourth_segment_only_when_numeric() {
        assert_eq!(parse_sequence_id("svcA.1.2.10.log"), Some(10));
        assert_eq!(parse_sequence_id("svcA.1.2.10"), Some(10));
        assert_eq!(parse_sequence_id("svcA.1.2"), None);
        assert_eq!(parse_sequence_id("svcA.1.2.x10.log"), None);
        assert_eq!(parse_sequence_id("svcA.1.2..log"), None);
        assert_eq!(parse_sequence_id("svcA.1.2.-3.log"), None);
        assert_eq!(parse_sequence_id("kernel"), None);
    }

    #[test]
    fn threshold_keeps_ids_above_max_minus_count() {
        assert_eq!(select_by_threshold(&svc_a_files(), 5), names(&["svcA.1.2.20.log"]));
        assert_eq!(
            select_by_threshold(&svc_a_files(), 6),
            names(&["svcA.1.2.15.log", "svcA.1.2.20.log"])
        );
    }

    #[test]
    fn threshold_preserves_input_order_and_may_exceed_count() {
        let files = names(&[
            "svcA.x.y.9.log",
            "svcA.x.y.8.log",
            "svcA.x.y.9.gz",
            "svcA.noid",
            "svcA.x.y.9.bak",
        ]);
        assert_eq!(
            select_by_threshold(&files, 1),
            names(&["svcA.x.y.9.log", "svcA.x.y.9.gz", "svcA.x.y.9.bak"])
        );
    }

    #[test]
    fn threshold_with_non_positive_count_selects_nothing() {
        assert!(select_by_threshold(&svc_a_files(), 0).is_empty());
        assert!(select_by_threshold(&svc_a_files(), -3).is_empty());
    }

    #[test]
    fn threshold_without_ids_is_empty() {
        assert!(select_by_threshold(&names(&["kernel", "a.b.c"]), 10).is_empty());
        assert!(select_by_threshold::<String>(&[], 10).is_empty());
    }

    #[test]
    fn top_n_orders_by_descending_id() {
        assert_eq!(
            select_top_n(&svc_a_files(), 2),
            names(&["svcA.1.2.20.log", "svcA.1.2.15.log"])
        );
        assert_eq!(select_top_n(&svc_a_files(), 10).len(), 3);
        assert!(select_top_n(&svc_a_files(), 0).is_empty());
        assert!(select_top_n(&svc_a_files(), -1).is_empty());
    }

    #[test]
    fn top_n_ties_keep_listing_order() {
        let files = names(&["s.a.b.5.first", "s.a.b.7.x", "s.a.b.5.second", "s.a.b.5.third"]);
        assert_eq!(
            select_top_n(&files, 3),
            names(&["s.a.b.7.x", "s.a.b.5.first", "s.a.b.5.second"])
        );
    }

    #[test]
    fn top_n_is_idempotent() {
        let files = names(&["s.a.b.3.x", "s.a.b.11.x", "s.a.b.7.x", "s.a.b.1.x", "noid"]);
        let once = select_top_n(&files, 3);
        assert_eq!(select_top_n(&once, 3), once);
        assert!(once.len() <= 3);
    }

    #[test]
    fn select_logs_single_service_uses_threshold() {
        assert_eq!(
            select_logs(&svc_a_files(), &["svcA"], 5),
            names(&["svcA.1.2.20.log"])
        );
    }

    #[test]
    fn select_logs_multiple_services_uses_top_n() {
        assert_eq!(
            select_logs(&svc_a_files(), &["svcA", "svcB"], 2),
            names(&["svcA.1.2.20.log", "svcA.1.2.15.log"])
        );
    }

    #[test]
    fn select_logs_empty_inputs() {
        assert!(select_logs::<String, &str>(&[], &["svcA"], 5).is_empty());
        assert!(select_logs::<String, &str>(&svc_a_files(), &[], 5).is_empty());
    }

    #[test]
    fn select_logs_prefix_is_case_sensitive() {
        assert!(select_logs(&svc_a_files(), &["svca"], 5).is_empty());
    }

    #[test]
    fn select_logs_dedupes_overlapping_prefixes() {
        let files = names(&[
            "pudutech-mirsdk.g3log.x.1.log",
            "pudutech-mirsdk.g3log.x.2.log",
            "mirsdk.g3log.x.3.log",
            "pudutech-mirsdk.g3log.x.2.log",
        ]);
        let services = ["pudutech-mirsdk", "pudutech-mirsdk.g3log", "mirsdk"];
        let selected = select_logs(&files, &services, 5);

        let unique: HashSet<&String> = selected.iter().collect();
        assert_eq!(unique.len(), selected.len());
        assert_eq!(
            selected,
            names(&[
                "pudutech-mirsdk.g3log.x.2.log",
                "pudutech-mirsdk.g3log.x.1.log",
                "mirsdk.g3log.x.3.log",
            ])
        );
    }

    #[test]
    fn single_service_drops_repeated_names() {
        let files = names(&["s.a.b.5.log", "s.a.b.6.log", "s.a.b.5.log", "s.a.b.6.log"]);
        assert_eq!(
            select_logs(&files, &["s"], 2),
            names(&["s.a.b.5.log", "s.a.b.6.log"])
        );
    }

    #[test]
    fn ids_beyond_u64_are_unranked() {
        assert_eq!(
            parse_sequence_id("svc.a.b.18446744073709551615.log"),
            Some(u64::MAX)
        );
        assert_eq!(parse_sequence_id("svc.a.b.18446744073709551616.log"), None);

        let files = names(&["svc.a.b.99999999999999999999999.log", "svc.a.b.7.log"]);
        assert_eq!(select_top_n(&files, 5), names(&["svc.a.b.7.log"]));
        assert_eq!(select_by_threshold(&files, 1), names(&["svc.a.b.7.log"]));
    }

    #[test]
    fn service_choice_parsing() {
        assert_eq!(ServiceChoice::parse("ALL", &[]), ServiceChoice::All);
        assert_eq!(ServiceChoice::parse("None", &[]), ServiceChoice::None);
        assert_eq!(ServiceChoice::parse("  ", &[]), ServiceChoice::None);
        assert_eq!(
            ServiceChoice::parse("CoreService", &[]),
            ServiceChoice::Single("CoreService".to_string())
        );
        assert_eq!(
            ServiceChoice::parse("all", &names(&["OTAService", " "])),
            ServiceChoice::Multi(names(&["OTAService"]))
        );
    }

    #[test]
    fn selector_expands_all_to_known_services() {
        let selector = LogSelector::new(names(&["svcA", "svcB"]));
        assert_eq!(selector.resolve_services(&ServiceChoice::All), names(&["svcA", "svcB"]));
        assert!(selector.resolve_services(&ServiceChoice::None).is_empty());

        let files = names(&["svcA.1.2.20.log", "svcB.1.2.3.log", "svcB.1.2.4.log", "svcC.1.2.9.log"]);
        assert_eq!(
            select_logs(&files, &selector.resolve_services(&ServiceChoice::All), 1),
            names(&["svcA.1.2.20.log", "svcB.1.2.4.log"])
        );
    }

    #[test]
    fn browse_filters_pdlog_case_insensitively_and_sorts() {
        let selector = LogSelector::new(names(&["CoreService", "OTAService"]));
        let files = names(&[
            "otaservice.x.y.2.PDLOG",
            "CoreService.x.y.9.pdlog",
            "CoreService.x.y.1.pdlog",
            "CoreService.x.y.1.pdlog",
            "CoreService.x.y.3.txt",
            "Unknown.x.y.1.pdlog",
        ]);

        assert_eq!(
            selector.browse(&files, &ServiceChoice::All),
            names(&[
                "CoreService.x.y.1.pdlog",
                "CoreService.x.y.9.pdlog",
                "Unknown.x.y.1.pdlog",
                "otaservice.x.y.2.PDLOG",
            ])
        );
        assert_eq!(
            selector.browse(&files, &ServiceChoice::Single("otaService".to_string())),
            names(&["otaservice.x.y.2.PDLOG"])
        );
        assert!(selector.browse(&files, &ServiceChoice::None).is_empty());
    }
}
