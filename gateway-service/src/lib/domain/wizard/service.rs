use std::sync::Arc;

use uuid::Uuid;

use crate::domain::otp::models::ContactMethod;
use crate::domain::otp::models::OtpRejection;
use crate::domain::otp::models::OtpRequestOutcome;
use crate::domain::otp::models::OtpVerifyOutcome;
use crate::domain::otp::ports::OtpServicePort;
use crate::domain::session::models::ChatRecord;
use crate::domain::session::models::GuestSession;
use crate::domain::session::models::SessionStatus;
use crate::domain::session::ports::SessionStore;
use crate::domain::session::service::SessionService;
use crate::domain::user::models::NewUser;
use crate::domain::user::models::UserId;
use crate::domain::user::ports::UserRepository;
use crate::domain::wizard::errors::WizardError;
use crate::domain::wizard::locks::SessionLocks;
use crate::domain::wizard::models::AuthTempRecord;
use crate::domain::wizard::models::Intent;
use crate::domain::wizard::models::ReplyDetail;
use crate::domain::wizard::models::WizardReply;
use crate::domain::wizard::parsers;
use crate::domain::wizard::ports::AuthTempRepository;
use crate::domain::wizard::ports::ChatAssistant;
use crate::domain::wizard::ports::TaskRepository;

const STEP1_PROMPT: &str = "Please provide your first name and last name (e.g., 'John Smith')";
const STEP2_PROMPT: &str = "please provide your date of birth (MM/DD/YYYY) and phone number \
     (e.g., '01/15/1990 (555) 123-4567'). Phone number is required for appointment reminders \
     and emergency contact.";
const OTP_OPTIONS: &str = "Your options:\n\
     - Type 'new otp' to get a fresh verification code\n\
     - Type 'restart' to begin authentication again";

/// The auth step orchestrator.
///
/// Drives a guest conversation through name collection, DOB + contact
/// collection, OTP verification, and into the resumed original task. Every
/// turn reads the session's state from the store and writes the next state
/// back, so any gateway instance can serve any message. Turns for the same
/// session are serialized through a per-session lock.
pub struct WizardService<S, T, U, O, A, K>
where
    S: SessionStore,
    T: AuthTempRepository,
    U: UserRepository,
    O: OtpServicePort,
    A: ChatAssistant,
    K: TaskRepository,
{
    sessions: Arc<SessionService<S>>,
    temp: Arc<T>,
    users: Arc<U>,
    otp: Arc<O>,
    assistant: Arc<A>,
    tasks: Arc<K>,
    locks: SessionLocks,
}

impl<S, T, U, O, A, K> WizardService<S, T, U, O, A, K>
where
    S: SessionStore,
    T: AuthTempRepository,
    U: UserRepository,
    O: OtpServicePort,
    A: ChatAssistant,
    K: TaskRepository,
{
    pub fn new(
        sessions: Arc<SessionService<S>>,
        temp: Arc<T>,
        users: Arc<U>,
        otp: Arc<O>,
        assistant: Arc<A>,
        tasks: Arc<K>,
    ) -> Self {
        Self {
            sessions,
            temp,
            users,
            otp,
            assistant,
            tasks,
            locks: SessionLocks::new(),
        }
    }

    pub fn locks(&self) -> &SessionLocks {
        &self.locks
    }

    /// Handle one guest message: validate the session, dispatch on its
    /// current state, and return the reply to show in the chat.
    pub async fn handle_message(
        &self,
        session_token: &str,
        user_query: &str,
    ) -> Result<WizardReply, WizardError> {
        let _guard = self.locks.acquire(session_token).await;

        let session = self.sessions.validate(session_token).await?;

        match session.status {
            SessionStatus::AwaitingAuthDetails => self.step_name(&session, user_query).await,
            SessionStatus::AwaitingDobEmail => self.step_dob_contact(&session, user_query).await,
            SessionStatus::AwaitingOtp => self.step_otp(&session, user_query).await,
            SessionStatus::AuthPaused => self.paused_followup(&session, user_query).await,
            SessionStatus::Authenticated
            | SessionStatus::BookingAppointment
            | SessionStatus::CreatingTicket => self.authenticated_flow(&session, user_query).await,
            _ => self.general_flow(&session, user_query).await,
        }
    }

    /// Pre-auth chat: answer info questions directly, start the wizard for
    /// intents that need identity.
    async fn general_flow(
        &self,
        session: &GuestSession,
        user_query: &str,
    ) -> Result<WizardReply, WizardError> {
        let intent = self.assistant.classify(user_query).await;

        if intent == Intent::Info {
            let output = self.assistant.answer_info(user_query).await;
            self.record(session, user_query, &output, session.status, "rag_info", false)
                .await;
            return Ok(WizardReply::new(output, session.status, ReplyDetail::InfoAnswer));
        }

        if intent.requires_auth() {
            self.temp
                .stash_intent(&session.session_id, intent, user_query)
                .await?;
            self.sessions
                .update_status(&session.session_id, SessionStatus::AwaitingAuthDetails)
                .await?;

            let output = format!(
                "I understand you want to {}. To proceed, I'll need to verify your identity \
                 first. Please provide your first name and last name.",
                match intent {
                    Intent::Appointment => "book an appointment",
                    _ => "open a support ticket",
                }
            );
            self.record(
                session,
                user_query,
                &output,
                SessionStatus::AwaitingAuthDetails,
                intent.as_str(),
                false,
            )
            .await;

            return Ok(WizardReply::new(
                output,
                SessionStatus::AwaitingAuthDetails,
                ReplyDetail::AuthStarted {
                    original_intent: intent,
                },
            ));
        }

        let output = "Sorry, I can not answer that! I can help you with appointments, \
             support tickets, and questions about our services."
            .to_string();
        self.record(session, user_query, &output, session.status, "general", false)
            .await;
        Ok(WizardReply::new(output, session.status, ReplyDetail::General { intent }))
    }

    /// Step 1: collect first and last name.
    async fn step_name(
        &self,
        session: &GuestSession,
        user_query: &str,
    ) -> Result<WizardReply, WizardError> {
        if parsers::is_restart_keyword(user_query) {
            return self.restart(session).await;
        }

        if parsers::looks_like_question(user_query) {
            return self.pause(session, user_query, SessionStatus::AwaitingAuthDetails).await;
        }

        let Some(name) = parsers::parse_name(user_query) else {
            self.record(
                session,
                user_query,
                STEP1_PROMPT,
                SessionStatus::AwaitingAuthDetails,
                "auth_validation",
                true,
            )
            .await;
            return Ok(WizardReply::new(
                STEP1_PROMPT,
                SessionStatus::AwaitingAuthDetails,
                ReplyDetail::ValidationError,
            ));
        };

        self.temp
            .save_names(&session.session_id, &name.first_name, &name.last_name)
            .await?;
        self.sessions
            .update_status(&session.session_id, SessionStatus::AwaitingDobEmail)
            .await?;

        let output = format!(
            "Thanks {}! Now please provide your date of birth (MM/DD/YYYY) and phone number \
             for verification.",
            name.first_name
        );
        self.record(
            session,
            "[Name provided]",
            &output,
            SessionStatus::AwaitingDobEmail,
            "auth_step1",
            true,
        )
        .await;

        Ok(WizardReply::new(
            output,
            SessionStatus::AwaitingDobEmail,
            ReplyDetail::StepAdvanced,
        ))
    }

    /// Step 2: collect DOB and contact, look up the user, dispatch the OTP.
    async fn step_dob_contact(
        &self,
        session: &GuestSession,
        user_query: &str,
    ) -> Result<WizardReply, WizardError> {
        if parsers::is_restart_keyword(user_query) {
            return self.restart(session).await;
        }

        if parsers::looks_like_question(user_query) {
            return self.pause(session, user_query, SessionStatus::AwaitingDobEmail).await;
        }

        let temp = self.temp.find(&session.session_id).await?;
        let Some(temp) = temp.filter(AuthTempRecord::has_names) else {
            // Required session data is missing; drop back to step 1.
            return self.reset_to_step_one(session, user_query).await;
        };
        let first_name = temp.first_name.as_deref().unwrap_or_default().to_string();

        let parsed = parsers::parse_dob_contact(user_query);
        // Phone is required for healthcare contact; email alone is not enough.
        let Some(parsed) = parsed.filter(|p| p.phone.is_some()) else {
            let output = format!("Hi {first_name}, {STEP2_PROMPT}");
            self.record(
                session,
                user_query,
                &output,
                SessionStatus::AwaitingDobEmail,
                "auth_validation",
                true,
            )
            .await;
            return Ok(WizardReply::new(
                output,
                SessionStatus::AwaitingDobEmail,
                ReplyDetail::ValidationError,
            ));
        };

        let raw_phone = parsed.phone.as_deref().unwrap_or_default();
        let Ok(contact) = ContactMethod::parse(raw_phone) else {
            let output = format!("Hi {first_name}, {STEP2_PROMPT}");
            return Ok(WizardReply::new(
                output,
                SessionStatus::AwaitingDobEmail,
                ReplyDetail::ValidationError,
            ));
        };

        self.temp
            .save_dob_contact(
                &session.session_id,
                parsed.dob,
                parsed.email.as_deref(),
                Some(contact.as_str()),
                contact.channel(),
            )
            .await?;

        // Look up without creating; unknown identities stay unknown until
        // their contact method is verified.
        let last_name = temp.last_name.as_deref().unwrap_or_default();
        let existing = self
            .users
            .find_by_identity(&first_name, last_name, parsed.dob, &contact)
            .await?;
        let user_id = existing.map(|u| u.id);
        let is_new_user = user_id.is_none();

        self.temp
            .save_user_link(&session.session_id, user_id)
            .await?;

        match self.otp.request_code(&session.session_id, &contact, 1).await? {
            OtpRequestOutcome::Sent { .. } => {
                self.sessions
                    .update_status(&session.session_id, SessionStatus::AwaitingOtp)
                    .await?;

                let output = if is_new_user {
                    format!(
                        "Great! We'll create your profile after verification. A 6-digit \
                         verification code has been sent to {contact}.\n\
                         You have only 1 attempt to enter the correct code.\n\
                         Please enter the code carefully to complete your registration and \
                         authentication."
                    )
                } else {
                    format!(
                        "Welcome back! We've sent a 6-digit verification code to {contact}.\n\
                         You have only 1 attempt to enter the correct code.\n\
                         Please enter the code carefully to complete authentication."
                    )
                };
                self.record(
                    session,
                    "[DOB/Phone provided]",
                    &output,
                    SessionStatus::AwaitingOtp,
                    "auth_step2",
                    true,
                )
                .await;

                Ok(WizardReply::new(
                    output,
                    SessionStatus::AwaitingOtp,
                    ReplyDetail::OtpSent {
                        resent: false,
                        new_user: is_new_user,
                    },
                ))
            }
            OtpRequestOutcome::RateLimited {
                retry_after_seconds,
            } => {
                let wait_minutes = retry_after_seconds / 60 + 1;
                let output = format!(
                    "You've reached the maximum number of verification requests. For security, \
                     please wait {wait_minutes} minutes before trying again, or contact support \
                     for immediate assistance."
                );
                self.record(
                    session,
                    "[DOB/Phone provided]",
                    &output,
                    SessionStatus::AwaitingDobEmail,
                    "rate_limited",
                    true,
                )
                .await;

                // The guest stays on step 2; a later retry re-runs the lookup.
                Ok(WizardReply::new(
                    output,
                    SessionStatus::AwaitingDobEmail,
                    ReplyDetail::RateLimited {
                        retry_after_seconds,
                    },
                ))
            }
            OtpRequestOutcome::DeliveryFailed { .. } => {
                let output = "Sorry, there was an error sending the verification code. \
                     Please try again later.";
                self.record(
                    session,
                    "[DOB/Phone provided]",
                    output,
                    SessionStatus::AwaitingDobEmail,
                    "otp_error",
                    true,
                )
                .await;

                Ok(WizardReply::new(
                    output,
                    SessionStatus::AwaitingDobEmail,
                    ReplyDetail::DeliveryFailed,
                ))
            }
        }
    }

    /// Step 3: verify the single-attempt OTP, then finish the wizard.
    async fn step_otp(
        &self,
        session: &GuestSession,
        user_query: &str,
    ) -> Result<WizardReply, WizardError> {
        let temp = self.temp.find(&session.session_id).await?;
        let Some(temp) = temp.filter(AuthTempRecord::has_names) else {
            return self.restart(session).await;
        };

        if parsers::is_resend_keyword(user_query) {
            return self.resend(session, &temp).await;
        }

        if parsers::is_restart_keyword(user_query) {
            return self.restart(session).await;
        }

        match self.otp.verify_pending(&session.session_id, user_query).await? {
            OtpVerifyOutcome::Verified { .. } => self.finish_authentication(session, temp).await,
            OtpVerifyOutcome::Rejected {
                reason: OtpRejection::InvalidFormat,
                ..
            } => {
                let output = format!(
                    "Verification codes are 6 digits. Please enter the code exactly as you \
                     received it.\n\n{OTP_OPTIONS}"
                );
                self.record(
                    session,
                    "[OTP provided]",
                    &output,
                    SessionStatus::AwaitingOtp,
                    "auth_validation",
                    true,
                )
                .await;
                Ok(WizardReply::new(
                    output,
                    SessionStatus::AwaitingOtp,
                    ReplyDetail::ValidationError,
                ))
            }
            OtpVerifyOutcome::Rejected { .. } => {
                // Single attempt: whatever the cause, the code is gone.
                // Always "expired for security", never confirm a near-miss.
                let output = format!(
                    "Invalid verification code. The code has been expired for security.\n\n\
                     {OTP_OPTIONS}"
                );
                self.record(
                    session,
                    "[OTP provided]",
                    &output,
                    SessionStatus::AwaitingOtp,
                    "otp_invalid",
                    true,
                )
                .await;

                Ok(WizardReply::new(
                    output,
                    SessionStatus::AwaitingOtp,
                    ReplyDetail::OtpRetired,
                ))
            }
        }
    }

    /// OTP success: create the deferred user if needed, link the session,
    /// clean up, and resume the original task.
    async fn finish_authentication(
        &self,
        session: &GuestSession,
        temp: AuthTempRecord,
    ) -> Result<WizardReply, WizardError> {
        let (user_id, user_created) = match temp.user_id {
            Some(id) => (id, false),
            None => {
                // Deferred creation: the identity is only persisted now that
                // its contact method is verified.
                let Some(dob) = temp.dob else {
                    // Scratch data lost its DOB mid-flow; nothing safe to
                    // create, so start the wizard over.
                    return self.restart(session).await;
                };
                let new_user = NewUser {
                    first_name: temp.first_name.clone().unwrap_or_default(),
                    last_name: temp.last_name.clone().unwrap_or_default(),
                    dob,
                    email: temp.email.clone(),
                    phone: temp.phone.clone(),
                };
                match self.users.create(new_user).await {
                    Ok(user) => {
                        tracing::info!(user_id = %user.id, "Created user after OTP verification");
                        (user.id, true)
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "User creation failed after OTP verification");
                        let output = "Verification succeeded, but we encountered an error \
                             creating your account. Please try again or contact support if \
                             this persists.";
                        self.record(
                            session,
                            "[OTP verified]",
                            output,
                            SessionStatus::AwaitingOtp,
                            "auth_error",
                            true,
                        )
                        .await;
                        return Ok(WizardReply::new(
                            output,
                            SessionStatus::AwaitingOtp,
                            ReplyDetail::AccountCreationFailed,
                        ));
                    }
                }
            }
        };

        self.sessions
            .link_authenticated_user(&session.session_id, user_id)
            .await?;
        self.temp.delete(&session.session_id).await?;

        match (temp.original_intent, temp.original_query.as_deref()) {
            (Some(Intent::Appointment), query) => {
                let query = query.unwrap_or_default();
                self.sessions
                    .update_status(&session.session_id, SessionStatus::BookingAppointment)
                    .await?;
                let output = format!(
                    "Great! Now I can help you book an appointment. Based on your earlier \
                     request: '{query}'. What type of appointment would you like to schedule?"
                );
                self.record(
                    session,
                    "Authentication completed",
                    &output,
                    SessionStatus::BookingAppointment,
                    "appointment",
                    false,
                )
                .await;
                Ok(WizardReply::new(
                    output,
                    SessionStatus::BookingAppointment,
                    ReplyDetail::Authenticated {
                        user_id,
                        user_created,
                        resumed_intent: Some(Intent::Appointment),
                    },
                ))
            }
            (Some(Intent::Ticket), query) => {
                let query = query.unwrap_or_default();
                let ticket_type = parsers::extract_ticket_type(query);
                self.sessions
                    .update_status(&session.session_id, SessionStatus::CreatingTicket)
                    .await?;
                let output = format!(
                    "Perfect! I can now help you with your {ticket_type} request. Based on \
                     your earlier message: '{query}'. Please provide more details about your \
                     issue."
                );
                self.record(
                    session,
                    "Authentication completed",
                    &output,
                    SessionStatus::CreatingTicket,
                    "ticket",
                    false,
                )
                .await;
                Ok(WizardReply::new(
                    output,
                    SessionStatus::CreatingTicket,
                    ReplyDetail::Authenticated {
                        user_id,
                        user_created,
                        resumed_intent: Some(Intent::Ticket),
                    },
                ))
            }
            _ => {
                let output = "Verification Success! How can I help you today?";
                self.record(
                    session,
                    "[OTP verified]",
                    output,
                    SessionStatus::Authenticated,
                    "auth_success",
                    true,
                )
                .await;
                Ok(WizardReply::new(
                    output,
                    SessionStatus::Authenticated,
                    ReplyDetail::Authenticated {
                        user_id,
                        user_created,
                        resumed_intent: None,
                    },
                ))
            }
        }
    }

    /// "new otp": fresh code to the already-collected contact; the previous
    /// pending code is retired by the generation itself.
    async fn resend(
        &self,
        session: &GuestSession,
        temp: &AuthTempRecord,
    ) -> Result<WizardReply, WizardError> {
        let Some(raw_contact) = temp.contact() else {
            return self.restart(session).await;
        };
        let Ok(contact) = ContactMethod::parse(raw_contact) else {
            return self.restart(session).await;
        };

        match self.otp.request_code(&session.session_id, &contact, 1).await? {
            OtpRequestOutcome::Sent { .. } => {
                let output = format!(
                    "New verification code sent to {contact}!\n\
                     Please enter the 6-digit code to complete authentication.\n\
                     You have only 1 attempt to enter the correct code."
                );
                self.record(
                    session,
                    "new otp",
                    &output,
                    SessionStatus::AwaitingOtp,
                    "otp_resent",
                    true,
                )
                .await;
                Ok(WizardReply::new(
                    output,
                    SessionStatus::AwaitingOtp,
                    ReplyDetail::OtpSent {
                        resent: true,
                        new_user: temp.user_id.is_none(),
                    },
                ))
            }
            OtpRequestOutcome::RateLimited {
                retry_after_seconds,
            } => {
                let wait_minutes = retry_after_seconds / 60 + 1;
                let output = format!(
                    "Too many verification requests. Please wait {wait_minutes} minutes before \
                     requesting a new code, or type 'restart' to begin authentication with \
                     different contact info."
                );
                self.record(
                    session,
                    "new otp",
                    &output,
                    SessionStatus::AwaitingOtp,
                    "rate_limited",
                    true,
                )
                .await;
                Ok(WizardReply::new(
                    output,
                    SessionStatus::AwaitingOtp,
                    ReplyDetail::RateLimited {
                        retry_after_seconds,
                    },
                ))
            }
            OtpRequestOutcome::DeliveryFailed { .. } => {
                let output = "Sorry, there was an error generating a new verification code. \
                     Please type 'restart' to begin again or contact support.";
                Ok(WizardReply::new(
                    output,
                    SessionStatus::AwaitingOtp,
                    ReplyDetail::DeliveryFailed,
                ))
            }
        }
    }

    /// Wipe the wizard: scratch record gone, pending codes retired, back to
    /// step 1.
    async fn restart(&self, session: &GuestSession) -> Result<WizardReply, WizardError> {
        self.temp.delete(&session.session_id).await?;
        self.otp.retire_pending(&session.session_id).await?;
        self.sessions
            .update_status(&session.session_id, SessionStatus::AwaitingAuthDetails)
            .await?;

        let output = format!(
            "Let's start over with the authentication process.\n{STEP1_PROMPT}"
        );
        self.record(
            session,
            "restart",
            &output,
            SessionStatus::AwaitingAuthDetails,
            "auth_restart",
            true,
        )
        .await;

        Ok(WizardReply::new(
            output,
            SessionStatus::AwaitingAuthDetails,
            ReplyDetail::Restarted,
        ))
    }

    /// Step 2 found no usable scratch data: prompt for names again.
    async fn reset_to_step_one(
        &self,
        session: &GuestSession,
        user_query: &str,
    ) -> Result<WizardReply, WizardError> {
        self.sessions
            .update_status(&session.session_id, SessionStatus::AwaitingAuthDetails)
            .await?;

        let output = format!(
            "It looks like we need to start from the beginning. {STEP1_PROMPT}"
        );
        self.record(
            session,
            user_query,
            &output,
            SessionStatus::AwaitingAuthDetails,
            "auth_reset",
            true,
        )
        .await;

        Ok(WizardReply::new(
            output,
            SessionStatus::AwaitingAuthDetails,
            ReplyDetail::Restarted,
        ))
    }

    /// The guest asked an unrelated question mid-wizard: answer it, park
    /// the current step, and offer continue/restart.
    async fn pause(
        &self,
        session: &GuestSession,
        user_query: &str,
        resume_state: SessionStatus,
    ) -> Result<WizardReply, WizardError> {
        let answer = self.assistant.answer_info(user_query).await;

        self.temp
            .set_paused_state(&session.session_id, Some(resume_state))
            .await?;
        self.sessions
            .update_status(&session.session_id, SessionStatus::AuthPaused)
            .await?;

        let output = format!(
            "{answer}\n\nWe were in the middle of verifying your identity. Type 'continue' \
             to pick up where you left off, or 'restart' to start over."
        );
        self.record(session, user_query, &output, SessionStatus::AuthPaused, "rag_info", false)
            .await;

        Ok(WizardReply::new(
            output,
            SessionStatus::AuthPaused,
            ReplyDetail::Paused { resume_state },
        ))
    }

    /// Parked wizard: 'continue' restores the saved step, 'restart' wipes.
    async fn paused_followup(
        &self,
        session: &GuestSession,
        user_query: &str,
    ) -> Result<WizardReply, WizardError> {
        if parsers::is_restart_keyword(user_query) {
            return self.restart(session).await;
        }

        if parsers::is_continue_keyword(user_query) {
            let temp = self.temp.find(&session.session_id).await?;
            let resume_state = temp
                .and_then(|t| t.auth_paused_state)
                .unwrap_or(SessionStatus::AwaitingAuthDetails);

            self.temp
                .set_paused_state(&session.session_id, None)
                .await?;
            self.sessions
                .update_status(&session.session_id, resume_state)
                .await?;

            let output = match resume_state {
                SessionStatus::AwaitingDobEmail => {
                    "Picking up where we left off. Please provide your date of birth \
                     (MM/DD/YYYY) and phone number."
                }
                _ => "Picking up where we left off. Please provide your first name and \
                     last name (e.g., 'John Smith')",
            };
            self.record(session, user_query, output, resume_state, "auth_resume", false)
                .await;

            return Ok(WizardReply::new(output, resume_state, ReplyDetail::Resumed));
        }

        let output = "Type 'continue' to resume identity verification or 'restart' to \
             start over.";
        Ok(WizardReply::new(
            output,
            SessionStatus::AuthPaused,
            ReplyDetail::ValidationError,
        ))
    }

    /// Post-auth chat: info answers, appointment booking, ticket creation.
    async fn authenticated_flow(
        &self,
        session: &GuestSession,
        user_query: &str,
    ) -> Result<WizardReply, WizardError> {
        let Some(link) = self
            .sessions
            .find_authenticated_user(&session.session_id)
            .await?
        else {
            // Authenticated marker without a link: downgrade and handle as
            // a fresh guest.
            self.sessions
                .update_status(&session.session_id, SessionStatus::Active)
                .await?;
            return self.general_flow(session, user_query).await;
        };

        let intent = self.assistant.classify(user_query).await;
        match intent {
            Intent::Info => {
                let output = self.assistant.answer_info(user_query).await;
                self.record(session, user_query, &output, SessionStatus::Authenticated, "rag_info", false)
                    .await;
                Ok(WizardReply::new(
                    output,
                    SessionStatus::Authenticated,
                    ReplyDetail::InfoAnswer,
                ))
            }
            Intent::Appointment => self.book_appointment(session, user_query, link.user_id).await,
            Intent::Ticket => self.create_ticket(session, user_query, link.user_id).await,
            Intent::General => {
                let output = "I'm here to help! You can book appointments, create tickets, \
                     or ask any questions about our healthcare services.";
                self.record(session, user_query, output, SessionStatus::Authenticated, "general", false)
                    .await;
                Ok(WizardReply::new(
                    output,
                    SessionStatus::Authenticated,
                    ReplyDetail::General { intent },
                ))
            }
        }
    }

    async fn book_appointment(
        &self,
        session: &GuestSession,
        user_query: &str,
        user_id: UserId,
    ) -> Result<WizardReply, WizardError> {
        let booking_id = Uuid::new_v4().to_string();
        let appointment_type = parsers::extract_appointment_type(user_query);

        let stored = self
            .tasks
            .create_appointment(user_id, &booking_id, appointment_type, user_query)
            .await;

        let short_id = &booking_id[..8];
        let output = match stored {
            Ok(()) => format!(
                "Your {appointment_type} appointment has been booked successfully! Booking ID: \
                 {short_id}. You'll receive a confirmation shortly."
            ),
            Err(e) => {
                tracing::error!(error = %e, "Appointment record creation failed");
                format!(
                    "I've received your appointment request (ID: {short_id}). Our team will \
                     contact you within 24 hours to confirm the details."
                )
            }
        };

        self.sessions
            .update_status(&session.session_id, SessionStatus::Authenticated)
            .await?;
        self.record(session, user_query, &output, SessionStatus::Authenticated, "appointment", false)
            .await;

        Ok(WizardReply::new(
            output,
            SessionStatus::Authenticated,
            ReplyDetail::AppointmentBooked {
                booking_id,
                appointment_type: appointment_type.to_string(),
            },
        ))
    }

    async fn create_ticket(
        &self,
        session: &GuestSession,
        user_query: &str,
        user_id: UserId,
    ) -> Result<WizardReply, WizardError> {
        let ticket_id = Uuid::new_v4().to_string();
        let ticket_type = parsers::extract_ticket_type(user_query);
        let priority = parsers::ticket_priority(user_query);

        self.tasks
            .create_ticket(user_id, &ticket_id, ticket_type, priority, user_query)
            .await?;

        let short_id = &ticket_id[..8];
        let output = format!(
            "Your {ticket_type} support ticket has been created successfully! Ticket ID: \
             {short_id}. We'll respond within 2 business hours."
        );

        self.sessions
            .update_status(&session.session_id, SessionStatus::Authenticated)
            .await?;
        self.record(session, user_query, &output, SessionStatus::Authenticated, "ticket", false)
            .await;

        Ok(WizardReply::new(
            output,
            SessionStatus::Authenticated,
            ReplyDetail::TicketCreated {
                ticket_id,
                ticket_type: ticket_type.to_string(),
                priority,
            },
        ))
    }

    async fn record(
        &self,
        session: &GuestSession,
        user_query: &str,
        bot_response: &str,
        state: SessionStatus,
        intent: &str,
        is_sensitive: bool,
    ) {
        let mut record = ChatRecord::new(
            &session.session_id,
            user_query,
            bot_response,
            state,
            intent,
        );
        if is_sensitive {
            record = record.sensitive();
        }
        self.sessions.record_chat(record).await;
    }
}


#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::DateTime;
    use chrono::Duration;
    use chrono::NaiveDate;
    use chrono::Utc;
    use mockall::mock;
    use mockall::predicate::*;

    use super::*;
    use crate::domain::otp::errors::OtpError;
    use crate::domain::otp::models::OtpChannel;
    use crate::domain::otp::models::OtpStats;
    use crate::domain::otp::models::VerifiedContact;
    use crate::domain::session::errors::SessionError;
    use crate::domain::session::models::AuthenticatedLink;
    use crate::domain::user::errors::UserError;
    use crate::domain::user::models::User;
    use crate::domain::wizard::errors::TaskError;
    use crate::domain::wizard::errors::TempRecordError;
    use crate::domain::wizard::models::TicketPriority;

    mock! {
        pub Store {}

        #[async_trait]
        impl SessionStore for Store {
            async fn create(&self, session: GuestSession) -> Result<GuestSession, SessionError>;
            async fn find(&self, session_id: &str) -> Result<Option<GuestSession>, SessionError>;
            async fn touch(&self, session_id: &str, expires_at: DateTime<Utc>) -> Result<(), SessionError>;
            async fn update_status(&self, session_id: &str, status: SessionStatus) -> Result<(), SessionError>;
            async fn link_authenticated_user(&self, session_id: &str, user_id: UserId) -> Result<(), SessionError>;
            async fn find_authenticated_user(&self, session_id: &str) -> Result<Option<AuthenticatedLink>, SessionError>;
            async fn record_chat(&self, record: ChatRecord) -> Result<(), SessionError>;
            async fn delete_expired(&self, grace_minutes: i64) -> Result<u64, SessionError>;
        }
    }

    mock! {
        pub Temp {}

        #[async_trait]
        impl AuthTempRepository for Temp {
            async fn stash_intent(&self, session_id: &str, intent: Intent, query: &str) -> Result<(), TempRecordError>;
            async fn save_names(&self, session_id: &str, first_name: &str, last_name: &str) -> Result<(), TempRecordError>;
            async fn save_dob_contact<'a, 'b, 'c, 'd>(&'a self, session_id: &'b str, dob: NaiveDate, email: Option<&'c str>, phone: Option<&'d str>, channel: OtpChannel) -> Result<(), TempRecordError>;
            async fn save_user_link(&self, session_id: &str, user_id: Option<UserId>) -> Result<(), TempRecordError>;
            async fn set_paused_state(&self, session_id: &str, state: Option<SessionStatus>) -> Result<(), TempRecordError>;
            async fn find(&self, session_id: &str) -> Result<Option<AuthTempRecord>, TempRecordError>;
            async fn delete(&self, session_id: &str) -> Result<(), TempRecordError>;
            async fn delete_expired(&self) -> Result<u64, TempRecordError>;
        }
    }

    mock! {
        pub Users {}

        #[async_trait]
        impl UserRepository for Users {
            async fn find_by_identity(&self, first_name: &str, last_name: &str, dob: NaiveDate, contact: &ContactMethod) -> Result<Option<User>, UserError>;
            async fn create(&self, user: NewUser) -> Result<User, UserError>;
            async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserError>;
        }
    }

    mock! {
        pub Otp {}

        #[async_trait]
        impl OtpServicePort for Otp {
            async fn request_code(&self, session_id: &str, contact: &ContactMethod, attempts: i32) -> Result<OtpRequestOutcome, OtpError>;
            async fn verify_pending(&self, session_id: &str, submitted: &str) -> Result<OtpVerifyOutcome, OtpError>;
            async fn verify_code(&self, otp_id: &str, session_id: &str, submitted: &str) -> Result<OtpVerifyOutcome, OtpError>;
            async fn cancel(&self, otp_id: &str, session_id: &str) -> Result<bool, OtpError>;
            async fn retire_pending(&self, session_id: &str) -> Result<u64, OtpError>;
            async fn verified_contact(&self, session_id: &str) -> Result<Option<VerifiedContact>, OtpError>;
            async fn stats(&self, contact: &ContactMethod) -> Result<OtpStats, OtpError>;
        }
    }

    mock! {
        pub Assistant {}

        #[async_trait]
        impl ChatAssistant for Assistant {
            async fn classify(&self, query: &str) -> Intent;
            async fn answer_info(&self, query: &str) -> String;
        }
    }

    mock! {
        pub Tasks {}

        #[async_trait]
        impl TaskRepository for Tasks {
            async fn create_appointment(&self, user_id: UserId, booking_id: &str, appointment_type: &str, details: &str) -> Result<(), TaskError>;
            async fn create_ticket(&self, user_id: UserId, ticket_id: &str, ticket_type: &str, priority: TicketPriority, description: &str) -> Result<(), TaskError>;
        }
    }

    const SESSION: &str = "guest_aabbccdd";

    /// SessionStore mock preloaded with a live session in the given state;
    /// find/touch/record_chat are free, everything else must be expected.
    fn store_in_state(status: SessionStatus) -> MockStore {
        let mut store = MockStore::new();
        let now = Utc::now();
        let session = GuestSession {
            session_id: SESSION.to_string(),
            status,
            created_at: now,
            expires_at: now + Duration::minutes(30),
            last_activity: now,
        };
        store
            .expect_find()
            .returning(move |_| Ok(Some(session.clone())));
        store.expect_touch().returning(|_, _| Ok(()));
        store.expect_record_chat().returning(|_| Ok(()));
        store
    }

    fn temp_with_names() -> AuthTempRecord {
        AuthTempRecord {
            session_id: SESSION.to_string(),
            first_name: Some("Jane".into()),
            last_name: Some("Doe".into()),
            ..Default::default()
        }
    }

    fn temp_ready_for_otp(user_id: Option<UserId>, original_intent: Option<Intent>) -> AuthTempRecord {
        AuthTempRecord {
            session_id: SESSION.to_string(),
            first_name: Some("Jane".into()),
            last_name: Some("Doe".into()),
            dob: NaiveDate::from_ymd_opt(1985, 3, 12),
            phone: Some("+15551112222".into()),
            preferred_otp_channel: Some(OtpChannel::Sms),
            user_id,
            original_intent,
            original_query: original_intent.map(|_| "book me a heart checkup".to_string()),
            ..Default::default()
        }
    }

    #[allow(clippy::type_complexity)]
    fn service(
        store: MockStore,
        temp: MockTemp,
        users: MockUsers,
        otp: MockOtp,
        assistant: MockAssistant,
        tasks: MockTasks,
    ) -> WizardService<MockStore, MockTemp, MockUsers, MockOtp, MockAssistant, MockTasks> {
        WizardService::new(
            Arc::new(SessionService::new(Arc::new(store), 60)),
            Arc::new(temp),
            Arc::new(users),
            Arc::new(otp),
            Arc::new(assistant),
            Arc::new(tasks),
        )
    }

    #[tokio::test]
    async fn test_invalid_session_rejected() {
        let mut store = MockStore::new();
        store.expect_find().returning(|_| Ok(None));

        let service = service(
            store,
            MockTemp::new(),
            MockUsers::new(),
            MockOtp::new(),
            MockAssistant::new(),
            MockTasks::new(),
        );

        let result = service.handle_message("guest_nope", "hello").await;
        assert!(matches!(result, Err(WizardError::InvalidSession)));
    }

    #[tokio::test]
    async fn test_auth_intent_starts_wizard() {
        let mut store = store_in_state(SessionStatus::Active);
        store
            .expect_update_status()
            .with(eq(SESSION), eq(SessionStatus::AwaitingAuthDetails))
            .times(1)
            .returning(|_, _| Ok(()));

        let mut temp = MockTemp::new();
        temp.expect_stash_intent()
            .withf(|id, intent, query| {
                id == SESSION && *intent == Intent::Appointment && query.contains("appointment")
            })
            .times(1)
            .returning(|_, _, _| Ok(()));

        let mut assistant = MockAssistant::new();
        assistant
            .expect_classify()
            .returning(|_| Intent::Appointment);

        let service = service(store, temp, MockUsers::new(), MockOtp::new(), assistant, MockTasks::new());
        let reply = service
            .handle_message(SESSION, "I need an appointment")
            .await
            .unwrap();

        assert_eq!(reply.state, SessionStatus::AwaitingAuthDetails);
        assert_eq!(
            reply.detail,
            ReplyDetail::AuthStarted {
                original_intent: Intent::Appointment
            }
        );
    }

    #[tokio::test]
    async fn test_name_step_advances_on_full_name() {
        let mut store = store_in_state(SessionStatus::AwaitingAuthDetails);
        store
            .expect_update_status()
            .with(eq(SESSION), eq(SessionStatus::AwaitingDobEmail))
            .times(1)
            .returning(|_, _| Ok(()));

        let mut temp = MockTemp::new();
        temp.expect_save_names()
            .withf(|id, first, last| id == SESSION && first == "John" && last == "Smith")
            .times(1)
            .returning(|_, _, _| Ok(()));

        let service = service(store, temp, MockUsers::new(), MockOtp::new(), MockAssistant::new(), MockTasks::new());
        let reply = service.handle_message(SESSION, "John Smith").await.unwrap();

        assert_eq!(reply.state, SessionStatus::AwaitingDobEmail);
        assert_eq!(reply.detail, ReplyDetail::StepAdvanced);
        assert!(reply.output.contains("Thanks John"));
    }

    #[tokio::test]
    async fn test_name_step_single_token_reprompts() {
        // No update_status and no save_names expectations: any call panics.
        let store = store_in_state(SessionStatus::AwaitingAuthDetails);
        let temp = MockTemp::new();

        let service = service(store, temp, MockUsers::new(), MockOtp::new(), MockAssistant::new(), MockTasks::new());
        let reply = service.handle_message(SESSION, "John").await.unwrap();

        assert_eq!(reply.state, SessionStatus::AwaitingAuthDetails);
        assert_eq!(reply.detail, ReplyDetail::ValidationError);
    }

    #[tokio::test]
    async fn test_dob_step_sends_otp_for_new_identity() {
        let mut store = store_in_state(SessionStatus::AwaitingDobEmail);
        store
            .expect_update_status()
            .with(eq(SESSION), eq(SessionStatus::AwaitingOtp))
            .times(1)
            .returning(|_, _| Ok(()));

        let mut temp = MockTemp::new();
        temp.expect_find()
            .returning(|_| Ok(Some(temp_with_names())));
        temp.expect_save_dob_contact()
            .withf(|id, dob, _email, phone, channel| {
                id == SESSION
                    && *dob == NaiveDate::from_ymd_opt(1985, 3, 12).unwrap()
                    && *phone == Some("+15551112222")
                    && *channel == OtpChannel::Sms
            })
            .times(1)
            .returning(|_, _, _, _, _| Ok(()));
        temp.expect_save_user_link()
            .with(eq(SESSION), eq(None::<UserId>))
            .times(1)
            .returning(|_, _| Ok(()));

        let mut users = MockUsers::new();
        users
            .expect_find_by_identity()
            .withf(|first, last, _, contact| {
                first == "Jane" && last == "Doe" && contact.as_str() == "+15551112222"
            })
            .times(1)
            .returning(|_, _, _, _| Ok(None));

        let mut otp = MockOtp::new();
        otp.expect_request_code()
            .withf(|id, contact, attempts| {
                id == SESSION && contact.as_str() == "+15551112222" && *attempts == 1
            })
            .times(1)
            .returning(|_, _, _| {
                Ok(OtpRequestOutcome::Sent {
                    otp_id: "otp_11".into(),
                    channel: OtpChannel::Sms,
                    expires_in_minutes: 5,
                    requests_remaining: 4,
                })
            });

        let service = service(store, temp, users, otp, MockAssistant::new(), MockTasks::new());
        let reply = service
            .handle_message(SESSION, "03/12/1985 (555) 111-2222")
            .await
            .unwrap();

        assert_eq!(reply.state, SessionStatus::AwaitingOtp);
        assert_eq!(
            reply.detail,
            ReplyDetail::OtpSent {
                resent: false,
                new_user: true
            }
        );
        assert!(reply.output.contains("We'll create your profile"));
    }

    #[tokio::test]
    async fn test_dob_step_without_phone_reprompts() {
        let store = store_in_state(SessionStatus::AwaitingDobEmail);

        let mut temp = MockTemp::new();
        temp.expect_find()
            .returning(|_| Ok(Some(temp_with_names())));

        // Email alone is not enough: phone is required.
        let service = service(store, temp, MockUsers::new(), MockOtp::new(), MockAssistant::new(), MockTasks::new());
        let reply = service
            .handle_message(SESSION, "03/12/1985 jane@example.com")
            .await
            .unwrap();

        assert_eq!(reply.state, SessionStatus::AwaitingDobEmail);
        assert_eq!(reply.detail, ReplyDetail::ValidationError);
    }

    #[tokio::test]
    async fn test_dob_step_rate_limited_stays_put() {
        // update_status must not be called: the guest stays on step 2.
        let store = store_in_state(SessionStatus::AwaitingDobEmail);

        let mut temp = MockTemp::new();
        temp.expect_find()
            .returning(|_| Ok(Some(temp_with_names())));
        temp.expect_save_dob_contact()
            .returning(|_, _, _, _, _| Ok(()));
        temp.expect_save_user_link().returning(|_, _| Ok(()));

        let mut users = MockUsers::new();
        users
            .expect_find_by_identity()
            .returning(|_, _, _, _| Ok(None));

        let mut otp = MockOtp::new();
        otp.expect_request_code().times(1).returning(|_, _, _| {
            Ok(OtpRequestOutcome::RateLimited {
                retry_after_seconds: 1800,
            })
        });

        let service = service(store, temp, users, otp, MockAssistant::new(), MockTasks::new());
        let reply = service
            .handle_message(SESSION, "03/12/1985 (555) 111-2222")
            .await
            .unwrap();

        assert_eq!(reply.state, SessionStatus::AwaitingDobEmail);
        assert_eq!(
            reply.detail,
            ReplyDetail::RateLimited {
                retry_after_seconds: 1800
            }
        );
        assert!(reply.output.contains("wait 31 minutes"));
    }

    #[tokio::test]
    async fn test_otp_success_creates_deferred_user() {
        let mut store = store_in_state(SessionStatus::AwaitingOtp);
        store
            .expect_link_authenticated_user()
            .with(eq(SESSION), always())
            .times(1)
            .returning(|_, _| Ok(()));
        store
            .expect_update_status()
            .with(eq(SESSION), eq(SessionStatus::Authenticated))
            .times(1)
            .returning(|_, _| Ok(()));

        let mut temp = MockTemp::new();
        temp.expect_find()
            .returning(|_| Ok(Some(temp_ready_for_otp(None, None))));
        temp.expect_delete().with(eq(SESSION)).times(1).returning(|_| Ok(()));

        let mut users = MockUsers::new();
        // Exactly one user row, created only after verification succeeded
        users
            .expect_create()
            .withf(|user| {
                user.first_name == "Jane"
                    && user.last_name == "Doe"
                    && user.phone.as_deref() == Some("+15551112222")
            })
            .times(1)
            .returning(|user| {
                Ok(User {
                    id: UserId::new(),
                    first_name: user.first_name,
                    last_name: user.last_name,
                    dob: user.dob,
                    email: user.email,
                    phone: user.phone,
                    created_at: Utc::now(),
                })
            });

        let mut otp = MockOtp::new();
        otp.expect_verify_pending()
            .with(eq(SESSION), eq("123456"))
            .times(1)
            .returning(|_, _| {
                Ok(OtpVerifyOutcome::Verified {
                    otp_id: "otp_11".into(),
                    identifier: "+15551112222".into(),
                    channel: OtpChannel::Sms,
                })
            });

        let service = service(store, temp, users, otp, MockAssistant::new(), MockTasks::new());
        let reply = service.handle_message(SESSION, "123456").await.unwrap();

        assert_eq!(reply.state, SessionStatus::Authenticated);
        assert!(matches!(
            reply.detail,
            ReplyDetail::Authenticated {
                user_created: true,
                resumed_intent: None,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_otp_failure_creates_no_user() {
        let store = store_in_state(SessionStatus::AwaitingOtp);

        let mut temp = MockTemp::new();
        temp.expect_find()
            .returning(|_| Ok(Some(temp_ready_for_otp(None, None))));

        // Zero user rows on a failed attempt
        let users = MockUsers::new();

        let mut otp = MockOtp::new();
        otp.expect_verify_pending().times(1).returning(|_, _| {
            Ok(OtpVerifyOutcome::Rejected {
                reason: OtpRejection::Mismatch,
                attempts_remaining: 0,
            })
        });

        let service = service(store, temp, users, otp, MockAssistant::new(), MockTasks::new());
        let reply = service.handle_message(SESSION, "999999").await.unwrap();

        assert_eq!(reply.state, SessionStatus::AwaitingOtp);
        assert_eq!(reply.detail, ReplyDetail::OtpRetired);
        // Security wording: expired, never "wrong"
        assert!(reply.output.contains("expired for security"));
    }

    #[tokio::test]
    async fn test_otp_success_resumes_original_task() {
        let mut store = store_in_state(SessionStatus::AwaitingOtp);
        store
            .expect_link_authenticated_user()
            .times(1)
            .returning(|_, _| Ok(()));
        store
            .expect_update_status()
            .with(eq(SESSION), eq(SessionStatus::Authenticated))
            .times(1)
            .returning(|_, _| Ok(()));
        store
            .expect_update_status()
            .with(eq(SESSION), eq(SessionStatus::BookingAppointment))
            .times(1)
            .returning(|_, _| Ok(()));

        let existing_id = UserId::new();
        let mut temp = MockTemp::new();
        temp.expect_find().returning(move |_| {
            Ok(Some(temp_ready_for_otp(
                Some(existing_id),
                Some(Intent::Appointment),
            )))
        });
        temp.expect_delete().times(1).returning(|_| Ok(()));

        let mut otp = MockOtp::new();
        otp.expect_verify_pending().times(1).returning(|_, _| {
            Ok(OtpVerifyOutcome::Verified {
                otp_id: "otp_11".into(),
                identifier: "+15551112222".into(),
                channel: OtpChannel::Sms,
            })
        });

        let service = service(store, temp, MockUsers::new(), otp, MockAssistant::new(), MockTasks::new());
        let reply = service.handle_message(SESSION, "123456").await.unwrap();

        // Straight into the stashed task, not a generic greeting
        assert_eq!(reply.state, SessionStatus::BookingAppointment);
        assert_eq!(
            reply.detail,
            ReplyDetail::Authenticated {
                user_id: existing_id,
                user_created: false,
                resumed_intent: Some(Intent::Appointment),
            }
        );
        assert!(reply.output.contains("book me a heart checkup"));
    }

    #[tokio::test]
    async fn test_resend_keyword_requests_fresh_code() {
        let store = store_in_state(SessionStatus::AwaitingOtp);

        let mut temp = MockTemp::new();
        temp.expect_find()
            .returning(|_| Ok(Some(temp_ready_for_otp(None, None))));

        let mut otp = MockOtp::new();
        otp.expect_request_code()
            .withf(|id, contact, attempts| {
                id == SESSION && contact.as_str() == "+15551112222" && *attempts == 1
            })
            .times(1)
            .returning(|_, _, _| {
                Ok(OtpRequestOutcome::Sent {
                    otp_id: "otp_22".into(),
                    channel: OtpChannel::Sms,
                    expires_in_minutes: 5,
                    requests_remaining: 3,
                })
            });

        let service = service(store, temp, MockUsers::new(), otp, MockAssistant::new(), MockTasks::new());
        let reply = service.handle_message(SESSION, "new otp").await.unwrap();

        assert_eq!(reply.state, SessionStatus::AwaitingOtp);
        assert_eq!(
            reply.detail,
            ReplyDetail::OtpSent {
                resent: true,
                new_user: true
            }
        );
    }

    #[tokio::test]
    async fn test_restart_wipes_wizard_state() {
        let mut store = store_in_state(SessionStatus::AwaitingOtp);
        store
            .expect_update_status()
            .with(eq(SESSION), eq(SessionStatus::AwaitingAuthDetails))
            .times(1)
            .returning(|_, _| Ok(()));

        let mut temp = MockTemp::new();
        temp.expect_find()
            .returning(|_| Ok(Some(temp_ready_for_otp(None, None))));
        temp.expect_delete().with(eq(SESSION)).times(1).returning(|_| Ok(()));

        let mut otp = MockOtp::new();
        otp.expect_retire_pending()
            .with(eq(SESSION))
            .times(1)
            .returning(|_| Ok(1));

        let service = service(store, temp, MockUsers::new(), otp, MockAssistant::new(), MockTasks::new());
        let reply = service.handle_message(SESSION, "restart").await.unwrap();

        assert_eq!(reply.state, SessionStatus::AwaitingAuthDetails);
        assert_eq!(reply.detail, ReplyDetail::Restarted);
    }

    #[tokio::test]
    async fn test_question_mid_wizard_pauses() {
        let mut store = store_in_state(SessionStatus::AwaitingAuthDetails);
        store
            .expect_update_status()
            .with(eq(SESSION), eq(SessionStatus::AuthPaused))
            .times(1)
            .returning(|_, _| Ok(()));

        let mut temp = MockTemp::new();
        temp.expect_set_paused_state()
            .with(eq(SESSION), eq(Some(SessionStatus::AwaitingAuthDetails)))
            .times(1)
            .returning(|_, _| Ok(()));

        let mut assistant = MockAssistant::new();
        assistant
            .expect_answer_info()
            .returning(|_| "We're open Monday through Friday.".to_string());

        let service = service(store, temp, MockUsers::new(), MockOtp::new(), assistant, MockTasks::new());
        let reply = service
            .handle_message(SESSION, "What are your hours?")
            .await
            .unwrap();

        assert_eq!(reply.state, SessionStatus::AuthPaused);
        assert_eq!(
            reply.detail,
            ReplyDetail::Paused {
                resume_state: SessionStatus::AwaitingAuthDetails
            }
        );
        assert!(reply.output.contains("We're open"));
        assert!(reply.output.contains("'continue'"));
    }

    #[tokio::test]
    async fn test_continue_resumes_paused_step() {
        let mut store = store_in_state(SessionStatus::AuthPaused);
        store
            .expect_update_status()
            .with(eq(SESSION), eq(SessionStatus::AwaitingDobEmail))
            .times(1)
            .returning(|_, _| Ok(()));

        let mut temp = MockTemp::new();
        temp.expect_find().returning(|_| {
            Ok(Some(AuthTempRecord {
                session_id: SESSION.to_string(),
                first_name: Some("Jane".into()),
                last_name: Some("Doe".into()),
                auth_paused_state: Some(SessionStatus::AwaitingDobEmail),
                ..Default::default()
            }))
        });
        temp.expect_set_paused_state()
            .with(eq(SESSION), eq(None::<SessionStatus>))
            .times(1)
            .returning(|_, _| Ok(()));

        let service = service(store, temp, MockUsers::new(), MockOtp::new(), MockAssistant::new(), MockTasks::new());
        let reply = service.handle_message(SESSION, "continue").await.unwrap();

        assert_eq!(reply.state, SessionStatus::AwaitingDobEmail);
        assert_eq!(reply.detail, ReplyDetail::Resumed);
    }

    #[tokio::test]
    async fn test_authenticated_ticket_creation() {
        let mut store = store_in_state(SessionStatus::Authenticated);
        let user_id = UserId::new();
        store.expect_find_authenticated_user().returning(move |_| {
            Ok(Some(AuthenticatedLink {
                session_id: SESSION.to_string(),
                user_id,
                authenticated_at: Utc::now(),
            }))
        });
        store
            .expect_update_status()
            .with(eq(SESSION), eq(SessionStatus::Authenticated))
            .times(1)
            .returning(|_, _| Ok(()));

        let mut assistant = MockAssistant::new();
        assistant.expect_classify().returning(|_| Intent::Ticket);

        let mut tasks = MockTasks::new();
        tasks
            .expect_create_ticket()
            .withf(move |uid, _, ticket_type, priority, _| {
                *uid == user_id
                    && ticket_type == "prescription_refill"
                    && *priority == TicketPriority::Medium
            })
            .times(1)
            .returning(|_, _, _, _, _| Ok(()));

        let service = service(store, MockTemp::new(), MockUsers::new(), MockOtp::new(), assistant, tasks);
        let reply = service
            .handle_message(SESSION, "I need a medication refill")
            .await
            .unwrap();

        assert!(matches!(reply.detail, ReplyDetail::TicketCreated { .. }));
        assert!(reply.output.contains("support ticket has been created"));
    }
}
