use crate::models::{
    ContentItem, ContentPoint, DailyPoint, EngagementRecord, Platform, PlatformPoint,
    StatsResponse, Totals,
};
use chrono::{Duration, NaiveDate, Utc};
use std::collections::HashMap;

pub fn build_stats(content: &[ContentItem], engagement: &[EngagementRecord]) -> StatsResponse {
    build_stats_at(Utc::now().date_naive(), content, engagement)
}

fn interactions(likes: u64, comments: u64, shares: u64) -> u64 {
    likes.saturating_add(comments).saturating_add(shares)
}

pub fn build_stats_at(
    today: NaiveDate,
    content: &[ContentItem],
    engagement: &[EngagementRecord],
) -> StatsResponse {
    const DAY_COUNT: i64 = 7;

    let latest = latest_per_content(content, engagement, None);

    let mut totals = Totals {
        content_count: content.len(),
        ..Totals::default()
    };
    let mut platforms: Vec<PlatformPoint> = Platform::ALL
        .iter()
        .map(|platform| PlatformPoint {
            platform: *platform,
            content_count: 0,
            views: 0,
            interactions: 0,
        })
        .collect();
    let mut points = Vec::with_capacity(content.len());

    for item in content {
        let record = latest.get(item.id.as_str()).copied();
        let (views, likes, comments, shares) = record
            .map(|r| (r.views, r.likes, r.comments, r.shares))
            .unwrap_or_default();

        totals.views = totals.views.saturating_add(views);
        totals.likes = totals.likes.saturating_add(likes);
        totals.comments = totals.comments.saturating_add(comments);
        totals.shares = totals.shares.saturating_add(shares);

        if let Some(point) = platforms.iter_mut().find(|p| p.platform == item.platform) {
            point.content_count += 1;
            point.views = point.views.saturating_add(views);
            point.interactions = point
                .interactions
                .saturating_add(interactions(likes, comments, shares));
        }

        points.push(ContentPoint {
            id: item.id.clone(),
            name: item.name.clone(),
            platform: item.platform,
            views,
            likes,
            comments,
            shares,
            last_updated: record.map(|r| r.timestamp),
        });
    }
    totals.total_engagements = totals.views;

    let mut last_7_days = Vec::with_capacity(DAY_COUNT as usize);
    for offset in (0..DAY_COUNT).rev() {
        let date = today - Duration::days(offset);
        let as_of = latest_per_content(content, engagement, Some(date));
        let (views, interactions) = as_of.values().fold((0u64, 0u64), |(v, i), r| {
            (
                v.saturating_add(r.views),
                i.saturating_add(interactions(r.likes, r.comments, r.shares)),
            )
        });
        last_7_days.push(DailyPoint {
            date: date.to_string(),
            views,
            interactions,
        });
    }

    StatsResponse {
        totals,
        platforms,
        content: points,
        last_7_days,
    }
}

/// Most recent record per known content item, optionally ignoring records
/// taken after `as_of`. Records whose content is gone are dropped.
pub fn latest_per_content<'a>(
    content: &[ContentItem],
    engagement: &'a [EngagementRecord],
    as_of: Option<NaiveDate>,
) -> HashMap<&'a str, &'a EngagementRecord> {
    let known: std::collections::HashSet<&str> = content.iter().map(|c| c.id.as_str()).collect();
    let mut latest: HashMap<&'a str, &'a EngagementRecord> = HashMap::new();
    for record in engagement {
        if !known.contains(record.content_id.as_str()) {
            continue;
        }
        if as_of.is_some_and(|day| record.timestamp.date_naive() > day) {
            continue;
        }
        latest
            .entry(record.content_id.as_str())
            .and_modify(|current| {
                if record.timestamp > current.timestamp {
                    *current = record;
                }
            })
            .or_insert(record);
    }
    latest
}

/// `1500` → `"1,500"`.
pub fn format_count(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone};
    use std::collections::BTreeMap;

    fn item(id: &str, platform: Platform) -> ContentItem {
        ContentItem {
            id: id.to_string(),
            user_id: None,
            name: format!("Item {id}"),
            description: String::new(),
            platform,
            url: format!("https://example.com/{id}"),
            content_id: id.to_string(),
            published_date: None,
            duration: None,
            created_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            updated_at: None,
        }
    }

    fn record(content_id: &str, at: DateTime<Utc>, views: u64, likes: u64) -> EngagementRecord {
        EngagementRecord {
            id: None,
            content_id: content_id.to_string(),
            timestamp: at,
            views,
            likes,
            comments: 0,
            shares: 0,
            other_metrics: BTreeMap::new(),
            content: None,
        }
    }

    #[test]
    fn totals_use_latest_record_per_item() {
        let content = vec![item("a", Platform::Youtube), item("b", Platform::Servicenow)];
        let day = |d| Utc.with_ymd_and_hms(2026, 1, d, 12, 0, 0).unwrap();
        let engagement = vec![
            record("a", day(4), 1000, 100),
            record("b", day(4), 500, 30),
            record("a", day(2), 400, 10),
        ];

        let stats = build_stats_at(NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(), &content, &engagement);
        assert_eq!(stats.totals.content_count, 2);
        assert_eq!(stats.totals.total_engagements, 1500);
        assert_eq!(stats.totals.likes, 130);
        assert_eq!(format_count(stats.totals.total_engagements), "1,500");

        let youtube = &stats.platforms[0];
        assert_eq!((youtube.platform, youtube.content_count, youtube.views), (Platform::Youtube, 1, 1000));
        let linkedin = &stats.platforms[2];
        assert_eq!((linkedin.content_count, linkedin.views), (0, 0));
    }

    #[test]
    fn records_of_removed_content_are_ignored() {
        let content = vec![item("b", Platform::Servicenow)];
        let at = Utc.with_ymd_and_hms(2026, 1, 4, 12, 0, 0).unwrap();
        let engagement = vec![record("a", at, 1000, 0), record("b", at, 500, 0)];

        let stats = build_stats_at(NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(), &content, &engagement);
        assert_eq!(stats.totals.total_engagements, 500);
        assert_eq!(stats.content.len(), 1);
    }

    #[test]
    fn daily_series_follows_history() {
        let content = vec![item("a", Platform::Youtube)];
        let day = |d| Utc.with_ymd_and_hms(2026, 1, d, 9, 0, 0).unwrap();
        let engagement = vec![record("a", day(5), 300, 0), record("a", day(2), 100, 0)];

        let stats = build_stats_at(NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(), &content, &engagement);
        assert_eq!(stats.last_7_days.len(), 7);
        let views: Vec<u64> = stats.last_7_days.iter().map(|d| d.views).collect();
        assert_eq!(views, vec![0, 0, 0, 100, 100, 100, 300]);
        assert_eq!(stats.last_7_days[6].date, "2026-01-05");
    }

    #[test]
    fn huge_counts_saturate() {
        let content = vec![item("a", Platform::Youtube)];
        let at = Utc.with_ymd_and_hms(2026, 1, 4, 12, 0, 0).unwrap();
        let mut big = record("a", at, u64::MAX, u64::MAX);
        big.comments = 1;
        big.shares = 1;

        let stats = build_stats_at(NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(), &content, &[big]);
        assert_eq!(stats.platforms[0].interactions, u64::MAX);
        assert_eq!(stats.last_7_days[6].interactions, u64::MAX);
        assert_eq!(stats.totals.total_engagements, u64::MAX);
    }

    #[test]
    fn format_count_groups_thousands() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1000), "1,000");
        assert_eq!(format_count(1234567), "1,234,567");
    }
}
