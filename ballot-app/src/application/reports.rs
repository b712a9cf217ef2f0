use super::PollLifecycle;
use crate::domain::{OptionTally, Participation, Poll, Tally, VoterDetail};
use crate::infrastructure::db::{PollRepository, UserRepository};
use crate::infrastructure::live::{PresenceCounts, PresenceRegistry};
use ballot_errors::AppError;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const RECENT_POLLS: u64 = 5;
const ANONYMOUS_VOTER: &str = "Anonymous";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollSummary {
    #[serde(flatten)]
    pub poll: Poll,
    pub total_submissions: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteDetails {
    pub poll: Poll,
    /// Ranked by count, ties in option order.
    pub results: Vec<OptionTally>,
    pub total_selections: u32,
    pub stats: Participation,
    pub anonymous: bool,
    /// Always empty for anonymous polls.
    pub voter_details: Vec<VoterDetail>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionResult {
    pub option: String,
    pub count: u32,
    pub percentage: f64,
    /// Alphabetical. Always empty for anonymous polls.
    pub voters: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollResults {
    pub poll: Poll,
    pub results: Vec<OptionResult>,
    pub total_selections: u32,
    pub stats: Participation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportedSubmission {
    username: String,
    choices: Vec<String>,
    submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportDocument {
    poll: Poll,
    results: Vec<OptionTally>,
    submissions: Vec<ExportedSubmission>,
    exported_at: DateTime<Utc>,
}

/// A rendered download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export {
    pub filename: String,
    pub content_type: &'static str,
    pub body: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_users: u64,
    pub logged_in_users: u64,
    pub voted_users: u64,
    pub participation_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub current_vote: Option<Poll>,
    pub stats: DashboardStats,
    pub recent_votes: Vec<PollSummary>,
    pub live: PresenceCounts,
}

/// Read-only admin views over polls and their ballots.
///
/// Anonymous polls never expose who voted for what from here, whatever the storage holds.
pub struct Reports {
    lifecycle: Arc<PollLifecycle>,
    polls: PollRepository,
    users: UserRepository,
    presence: PresenceRegistry,
}

impl Reports {
    pub fn new(
        lifecycle: Arc<PollLifecycle>,
        polls: PollRepository,
        users: UserRepository,
        presence: PresenceRegistry,
    ) -> Self {
        Self {
            lifecycle,
            polls,
            users,
            presence,
        }
    }

    pub async fn all_votes(&self) -> Result<Vec<PollSummary>, AppError> {
        self.summaries(None).await
    }

    async fn summaries(&self, limit: Option<u64>) -> Result<Vec<PollSummary>, AppError> {
        self.polls
            .list_with_counts(limit)
            .await?
            .into_iter()
            .map(|(model, total_submissions)| {
                Ok(PollSummary {
                    poll: Poll::try_from(model)?,
                    total_submissions,
                })
            })
            .collect()
    }

    pub async fn vote_details(&self, poll_id: i32) -> Result<VoteDetails, AppError> {
        let poll = self.lifecycle.poll(poll_id).await?;
        let tally = self.lifecycle.tally_for(&poll).await?;
        let voter_details = if poll.anonymous {
            Vec::new()
        } else {
            self.lifecycle.voter_detail(poll.id).await?
        };
        let total_users = self.users.count().await?;

        Ok(VoteDetails {
            results: tally.ranked(),
            total_selections: tally.total_selections,
            stats: Participation::new(u64::from(tally.total_ballots), total_users),
            anonymous: poll.anonymous,
            voter_details,
            poll,
        })
    }

    /// Results for the most recently created poll, active or not.
    pub async fn results(&self) -> Result<PollResults, AppError> {
        let poll = self.latest_poll().await?;
        let tally = self.lifecycle.tally_for(&poll).await?;
        let voters = if poll.anonymous {
            Vec::new()
        } else {
            self.lifecycle.voter_detail(poll.id).await?
        };
        let total_users = self.users.count().await?;

        Ok(PollResults {
            results: option_results(&tally, &voters),
            total_selections: tally.total_selections,
            stats: Participation::new(u64::from(tally.total_ballots), total_users),
            poll,
        })
    }

    pub async fn export(&self, format: ExportFormat) -> Result<Export, AppError> {
        let poll = self.latest_poll().await?;
        let tally = self.lifecycle.tally_for(&poll).await?;
        let submissions: Vec<ExportedSubmission> = self
            .lifecycle
            .voter_detail(poll.id)
            .await?
            .into_iter()
            .map(|detail| ExportedSubmission {
                username: if poll.anonymous {
                    ANONYMOUS_VOTER.to_string()
                } else {
                    detail.username
                },
                choices: detail.choices,
                submitted_at: detail.submitted_at,
            })
            .collect();

        tracing::info!(
            "Exporting vote {} as {:?} ({} submissions)",
            poll.id,
            format,
            submissions.len()
        );

        match format {
            ExportFormat::Csv => Ok(Export {
                filename: format!("vote-results-{}.csv", poll.id),
                content_type: "text/csv; charset=utf-8",
                body: render_csv(&submissions),
            }),
            ExportFormat::Json => {
                let filename = format!("vote-results-{}.json", poll.id);
                let document = ExportDocument {
                    results: tally.entries,
                    submissions,
                    exported_at: Utc::now(),
                    poll,
                };
                let body = serde_json::to_string_pretty(&document).map_err(AppError::internal)?;
                Ok(Export {
                    filename,
                    content_type: "application/json",
                    body,
                })
            }
        }
    }

    pub async fn dashboard(&self) -> Result<Dashboard, AppError> {
        let total_users = self.users.count().await?;
        let voted_users = self.users.count_voted().await?;

        Ok(Dashboard {
            current_vote: self.lifecycle.current_poll().await?,
            stats: DashboardStats {
                total_users,
                logged_in_users: self.users.count_logged_in().await?,
                voted_users,
                participation_rate: Participation::new(voted_users, total_users).participation_rate,
            },
            recent_votes: self.summaries(Some(RECENT_POLLS)).await?,
            live: self.presence.counts(),
        })
    }

    async fn latest_poll(&self) -> Result<Poll, AppError> {
        self.polls
            .latest()
            .await?
            .ok_or_else(|| AppError::NotFound("Vote".into()))
            .and_then(Poll::try_from)
    }
}

fn option_results(tally: &Tally, voters: &[VoterDetail]) -> Vec<OptionResult> {
    tally
        .entries
        .iter()
        .map(|entry| {
            let mut names: Vec<String> = voters
                .iter()
                .filter(|detail| detail.choices.contains(&entry.option))
                .map(|detail| detail.username.clone())
                .collect();
            names.sort();
            OptionResult {
                option: entry.option.clone(),
                count: entry.count,
                percentage: entry.percentage,
                voters: names,
            }
        })
        .collect()
}

fn render_csv(submissions: &[ExportedSubmission]) -> String {
    let mut csv = String::from("Username,Choices,Submitted At\n");
    for submission in submissions {
        let row = [
            csv_field(&submission.username),
            csv_field(&submission.choices.join("; ")),
            csv_field(
                &submission
                    .submitted_at
                    .to_rfc3339_opts(SecondsFormat::Secs, true),
            ),
        ];
        csv.push_str(&row.join(","));
        csv.push('\n');
    }
    csv
}

fn csv_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NewPoll, Role};
    use crate::infrastructure::db::{connect_in_memory, CreateOutcome, SubmissionRepository};
    use crate::infrastructure::live::Notifier;

    struct Fixture {
        lifecycle: Arc<PollLifecycle>,
        reports: Reports,
        users: UserRepository,
    }

    async fn fixture() -> Fixture {
        let db = connect_in_memory().await.unwrap();
        let users = UserRepository::new(db.clone());
        let polls = PollRepository::new(db.clone());
        let lifecycle = Arc::new(PollLifecycle::new(
            polls.clone(),
            SubmissionRepository::new(db),
            users.clone(),
            Notifier::new(),
        ));
        let reports = Reports::new(
            lifecycle.clone(),
            polls,
            users.clone(),
            PresenceRegistry::new(),
        );
        Fixture {
            lifecycle,
            reports,
            users,
        }
    }

    async fn add_user(users: &UserRepository, name: &str) -> i32 {
        match users.create(name, "unused".into(), Role::User).await.unwrap() {
            CreateOutcome::Created(model) => model.id,
            CreateOutcome::UsernameTaken => panic!("duplicate fixture user {name}"),
        }
    }

    /// Three voters: user1 and user3 pick A, user2 picks B.
    async fn run_round(f: &Fixture, anonymous: bool) -> Poll {
        let ids = [
            add_user(&f.users, "user1").await,
            add_user(&f.users, "user2").await,
            add_user(&f.users, "user3").await,
        ];
        let poll = f
            .lifecycle
            .start_poll(NewPoll {
                title: "Class President".into(),
                description: None,
                options: vec!["A".into(), "B".into(), "C".into()],
                max_selections: 1,
                anonymous,
            })
            .await
            .unwrap();
        for (id, (name, choice)) in ids
            .into_iter()
            .zip([("user1", "A"), ("user2", "B"), ("user3", "A")])
        {
            f.lifecycle.submit(id, name, vec![choice.into()]).await.unwrap();
        }
        poll
    }

    #[tokio::test]
    async fn test_results_list_voters_per_option() {
        let f = fixture().await;
        let poll = run_round(&f, false).await;

        let results = f.reports.results().await.unwrap();
        assert_eq!(results.poll.id, poll.id);
        assert_eq!(results.results[0].voters, vec!["user1", "user3"]);
        assert_eq!(results.results[1].voters, vec!["user2"]);
        assert!(results.results[2].voters.is_empty());
        assert_eq!(results.stats.total_voted, 3);
        assert_eq!(results.stats.participation_rate, 100.0);

        let details = f.reports.vote_details(poll.id).await.unwrap();
        assert_eq!(details.results[0].option, "A");
        assert_eq!(details.voter_details.len(), 3);
    }

    #[tokio::test]
    async fn test_anonymous_poll_hides_voters() {
        let f = fixture().await;
        let poll = run_round(&f, true).await;

        let details = f.reports.vote_details(poll.id).await.unwrap();
        assert!(details.anonymous);
        assert!(details.voter_details.is_empty());
        assert_eq!(details.results[0].count, 2);
        assert_eq!(details.results[1].count, 1);

        let results = f.reports.results().await.unwrap();
        assert!(results.results.iter().all(|r| r.voters.is_empty()));

        let csv = f.reports.export(ExportFormat::Csv).await.unwrap();
        assert!(!csv.body.contains("user1"));
        assert_eq!(csv.body.matches("\"Anonymous\"").count(), 3);
    }

    #[tokio::test]
    async fn test_csv_export() {
        let f = fixture().await;
        let poll = run_round(&f, false).await;

        let export = f.reports.export(ExportFormat::Csv).await.unwrap();
        assert_eq!(export.filename, format!("vote-results-{}.csv", poll.id));
        let mut lines = export.body.lines();
        assert_eq!(lines.next(), Some("Username,Choices,Submitted At"));
        assert!(lines.next().unwrap().starts_with("\"user1\",\"A\","));
        assert_eq!(export.body.lines().count(), 4);
    }

    #[tokio::test]
    async fn test_json_export() {
        let f = fixture().await;
        run_round(&f, false).await;

        let export = f.reports.export(ExportFormat::Json).await.unwrap();
        let document: serde_json::Value = serde_json::from_str(&export.body).unwrap();
        assert_eq!(document["submissions"].as_array().unwrap().len(), 3);
        assert_eq!(document["results"][0]["count"], 2);
        assert_eq!(document["poll"]["title"], "Class President");
    }

    #[tokio::test]
    async fn test_nothing_to_report() {
        let f = fixture().await;
        assert!(matches!(f.reports.results().await, Err(AppError::NotFound(_))));
        assert!(matches!(
            f.reports.export(ExportFormat::Csv).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(f.reports.vote_details(1).await, Err(AppError::NotFound(_))));
        assert!(f.reports.all_votes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_history_and_dashboard() {
        let f = fixture().await;
        let first = run_round(&f, false).await;
        f.lifecycle
            .start_poll(NewPoll {
                title: "Field trip".into(),
                description: None,
                options: vec!["Zoo".into(), "Museum".into()],
                max_selections: 2,
                anonymous: false,
            })
            .await
            .unwrap();

        let history = f.reports.all_votes().await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].poll.title, "Field trip");
        assert_eq!(history[0].total_submissions, 0);
        assert_eq!(history[1].poll.id, first.id);
        assert_eq!(history[1].total_submissions, 3);

        let dashboard = f.reports.dashboard().await.unwrap();
        assert_eq!(dashboard.current_vote.unwrap().title, "Field trip");
        assert_eq!(dashboard.stats.total_users, 3);
        assert_eq!(dashboard.stats.voted_users, 0);
        assert_eq!(dashboard.recent_votes.len(), 2);
        assert_eq!(dashboard.live.total, 0);
    }

    #[test]
    fn test_csv_field_escaping() {
        assert_eq!(csv_field("plain"), "\"plain\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
