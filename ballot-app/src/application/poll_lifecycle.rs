use crate::domain::{LiveEvent, NewPoll, Poll, Submission, Tally, VoterDetail};
use crate::infrastructure::db::{
    PollRepository, RecordOutcome, SubmissionRepository, UserRepository,
};
use crate::infrastructure::live::Notifier;
use ballot_errors::AppError;
use serde::Serialize;

/// Where the calling voter stands with respect to the active poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteStatus {
    pub has_voted: bool,
    pub vote_exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vote_id: Option<i32>,
    pub submission: Option<Vec<String>>,
}

/// Owns the current poll: starting and ending rounds, recording ballots, counting them.
pub struct PollLifecycle {
    polls: PollRepository,
    submissions: SubmissionRepository,
    users: UserRepository,
    notifier: Notifier,
}

impl PollLifecycle {
    pub fn new(
        polls: PollRepository,
        submissions: SubmissionRepository,
        users: UserRepository,
        notifier: Notifier,
    ) -> Self {
        Self {
            polls,
            submissions,
            users,
            notifier,
        }
    }

    pub async fn start_poll(&self, new_poll: NewPoll) -> Result<Poll, AppError> {
        let new_poll = new_poll.validate()?;
        let poll = Poll::try_from(self.polls.start(&new_poll).await?)?;

        tracing::info!(
            "Started vote {} \"{}\" with {} options (max {}, anonymous: {})",
            poll.id,
            poll.title,
            poll.options.len(),
            poll.max_selections,
            poll.anonymous
        );
        self.notifier.publish(LiveEvent::PollStarted { poll: poll.clone() });
        Ok(poll)
    }

    pub async fn end_poll(&self) -> Result<(), AppError> {
        if !self.polls.end_active().await? {
            return Err(AppError::NoActivePoll);
        }

        tracing::info!("Ended the active vote");
        self.notifier.publish(LiveEvent::PollEnded {});
        Ok(())
    }

    pub async fn current_poll(&self) -> Result<Option<Poll>, AppError> {
        self.polls
            .find_active()
            .await?
            .map(Poll::try_from)
            .transpose()
    }

    pub async fn submit(
        &self,
        user_id: i32,
        username: &str,
        choices: Vec<String>,
    ) -> Result<Submission, AppError> {
        let poll = self.current_poll().await?.ok_or(AppError::NoActivePoll)?;

        // Early answer for the common case; the unique index below is what actually decides.
        if self.submissions.find(user_id, poll.id).await?.is_some() {
            return Err(AppError::AlreadySubmitted);
        }

        poll.check_choices(&choices)?;

        let model = match self.submissions.record(user_id, poll.id, &choices).await? {
            RecordOutcome::Recorded(model) => model,
            RecordOutcome::Duplicate => {
                tracing::warn!("Concurrent duplicate ballot from user {} on vote {}", user_id, poll.id);
                return Err(AppError::AlreadySubmitted);
            }
            RecordOutcome::PollClosed => return Err(AppError::NoActivePoll),
        };

        let total_users = self.users.count().await?;
        let total_voted = self.users.count_voted().await?;
        tracing::info!(
            "Recorded ballot from {} on vote {} ({}/{} voted)",
            username,
            poll.id,
            total_voted,
            total_users
        );
        self.notifier.publish(LiveEvent::SubmissionReceived {
            username: username.to_string(),
            total_voted,
            total_users,
        });

        Submission::try_from(model)
    }

    pub async fn vote_status(&self, user_id: i32) -> Result<VoteStatus, AppError> {
        let Some(poll) = self.polls.find_active().await? else {
            return Ok(VoteStatus {
                has_voted: false,
                vote_exists: false,
                vote_id: None,
                submission: None,
            });
        };

        let submission = match self.submissions.find(user_id, poll.id).await? {
            Some(model) => Some(model.choices()?),
            None => None,
        };

        Ok(VoteStatus {
            has_voted: submission.is_some(),
            vote_exists: true,
            vote_id: Some(poll.id),
            submission,
        })
    }

    pub async fn poll(&self, poll_id: i32) -> Result<Poll, AppError> {
        self.polls
            .find_by_id(poll_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Vote".into()))
            .and_then(Poll::try_from)
    }

    pub async fn tally(&self, poll_id: i32) -> Result<Tally, AppError> {
        let poll = self.poll(poll_id).await?;
        self.tally_for(&poll).await
    }

    pub async fn tally_for(&self, poll: &Poll) -> Result<Tally, AppError> {
        let ballots = self
            .submissions
            .for_vote(poll.id)
            .await?
            .iter()
            .map(|s| s.choices())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Tally::compute(&poll.options, &ballots))
    }

    /// Every ballot with its voter's name, in recording order.
    ///
    /// This does not look at the anonymous flag. Views that show it to admins must.
    pub async fn voter_detail(&self, poll_id: i32) -> Result<Vec<VoterDetail>, AppError> {
        self.submissions
            .for_vote_with_voters(poll_id)
            .await?
            .into_iter()
            .filter_map(|(submission, voter)| voter.map(|voter| (submission, voter)))
            .map(|(submission, voter)| {
                Ok(VoterDetail {
                    choices: submission.choices()?,
                    username: voter.username,
                    submitted_at: submission.submitted_at,
                })
            })
            .collect()
    }
}
