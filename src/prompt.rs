//! Advice prompt construction.
//!
//! Pure functions of the dashboard inputs; no I/O.

use crate::formatting::{format_metric_value, format_value};
use crate::models::{sorted_by_rank, PeriodProgress, SalesMetric, SalesRep};

/// Number of advice items requested from the model.
pub const ADVICE_COUNT: usize = 3;

/// Per-item character budget stated in the prompt and the response schema.
pub const ADVICE_MAX_CHARS: usize = 150;

/// Marker appended to metrics that reached their target, steering the model to praise them.
pub const TARGET_MET_MARKER: &str = "【目標達成】";

/// `- {label}: {current} / {target} (進捗 {n}%)`, plus the praise marker when met.
pub fn summarize_metric(metric: &SalesMetric) -> String {
    let mut line = format!(
        "- {}: {} / {} (進捗 {}%)",
        metric.label,
        format_metric_value(metric, metric.current),
        format_metric_value(metric, metric.target),
        metric.progress_percent()
    );
    if metric.target_met() {
        line.push(' ');
        line.push_str(TARGET_MET_MARKER);
    }
    line
}

pub fn summarize_metrics(metrics: &[SalesMetric]) -> String {
    metrics
        .iter()
        .map(summarize_metric)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn summarize_period_progress(progress: &PeriodProgress) -> String {
    let unit = Some(progress.unit.as_str());
    let official = progress
        .official
        .map(|official| format!(" (内、確定実績: {})", format_value(official, unit)))
        .unwrap_or_default();

    format!(
        "期間進捗: {}{} / {} (進捗 {}%)",
        format_value(progress.current, unit),
        official,
        format_value(progress.target, unit),
        progress.progress_percent()
    )
}

/// Ranking lines in rank order: `- 1位: 佐藤さん (310P)`.
pub fn summarize_ranking(ranking: &[SalesRep]) -> String {
    sorted_by_rank(ranking)
        .iter()
        .map(|rep| {
            format!(
                "- {}位: {}さん ({})",
                rep.rank,
                rep.name,
                format_value(rep.points, Some("P"))
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Builds the single instruction sent to the model.
pub fn build_advice_prompt(
    metrics: &[SalesMetric],
    period_progress: &PeriodProgress,
    daily_ranking: &[SalesRep],
) -> String {
    let period_summary = summarize_period_progress(period_progress);
    let metrics_summary = summarize_metrics(metrics);
    let ranking_summary = if daily_ranking.is_empty() {
        "- (本日のランキングはまだありません)".to_string()
    } else {
        summarize_ranking(daily_ranking)
    };

    format!(
        "# 役割
あなたはソフトバンクショップを運営する店舗マネージャーです。店舗評価を守るため、商材ごとの目標数は必ず達成すべき必達目標として扱います。

# 目的
以下の実績データをもとに、クルーのモチベーションを高め、今日すぐに行動へ移せるアドバイスを作成してください。
・目標とのギャップを埋める具体的なアクションを示す
・アクションは単純で地道なものに落とし込む
・凡事徹底の視点を必ず含める

# 出力形式
・{count}つの簡潔な箇条書き
・全体の進捗と残り日数を意識した内容にする
・各アドバイスは{max_chars}文字以内
・{marker}の指標は必ず称賛し、未達成の指標には前向きで具体的な次の一手を提案する
・「よし、今日も頑張ろう！」と思える、熱く力強い言葉にする
・トーン例：「あと目標まで〇〇件！この調子で□□を意識しましょう。」

# 入力データ
期間進捗概要：
{period}

個別数値の詳細：
{metrics}

本日のデイリーランキング：
{ranking}
",
        count = ADVICE_COUNT,
        max_chars = ADVICE_MAX_CHARS,
        marker = TARGET_MET_MARKER,
        period = period_summary,
        metrics = metrics_summary,
        ranking = ranking_summary,
    )
}
