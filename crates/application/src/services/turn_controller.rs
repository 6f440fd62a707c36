//! Conversation turn controller
//!
//! The controller owns the full-duplex voice loop: the microphone stays
//! open while the assistant thinks and speaks, so recognized speech is
//! classified on arrival and can cut off synthesis or an in-flight model
//! request at any point. All state lives on a single event-loop task;
//! recognition events, model replies, and timers are funneled through one
//! channel, which keeps the transitions race-free.

use std::sync::Arc;
use std::time::Duration;

use ai_speech::{
    RecognitionEvent, SpeechQueue, SpeechRecognizer, SpeechSynthesizer, TranscriptEvent, Utterance,
};
use domain::{Conversation, DEFAULT_MAX_TURN_PAIRS};
use futures::StreamExt;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at, sleep, sleep_until};
use tracing::{debug, info, instrument, warn};

use crate::classify::{
    VoiceCommand, is_interrupt_starter, is_short_ack, looks_like_echo, normalize,
    parse_voice_command,
};
use crate::name_capture::{extract_name, strip_name_intro};
use crate::ports::InferencePort;
use crate::services::chunker::{SpeechChunker, speakable};

/// System prompt for the conversational persona
pub const SYSTEM_PROMPT: &str = "You're a friendly human-like conversation partner. Talk naturally like a close friend: warm, casual, and supportive. Don't answer like a textbook or a Q&A bot—respond like you're chatting in real time. Use contractions, short paragraphs, and occasional gentle follow-up questions. Avoid bullet lists unless the user asks. Reply in 3–6 short sentences by default, but go shorter if the user asks for a quick answer.";

/// Spoken when a turn fails and the upstream gave no message of its own
pub const FALLBACK_ERROR_MESSAGE: &str =
    "Sorry, I encountered an error. Please check the connection and try again.";

/// Spoken while waiting on a slow buffered reply
const THINKING_FILLER: &str = "Okay…";

/// Phase of the conversation loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    /// Conversation mode is off
    Idle,
    /// Waiting for the user to speak
    Listening,
    /// A model request is in flight
    Thinking,
    /// The assistant's reply is playing
    Speaking,
}

/// Timing knobs for the turn loop. Defaults match spoken turn-taking:
/// a second of silence ends a turn, slightly less when the user is
/// answering over an in-flight request.
#[derive(Debug, Clone)]
pub struct TurnControllerConfig {
    /// Silence before a heard utterance is submitted
    pub silence_submit_ms: u64,
    /// Faster submit while a request is already in flight
    pub thinking_submit_ms: u64,
    /// Submit delay after a barge-in mid-speech
    pub interrupt_submit_ms: u64,
    /// Submit delay after an explicit interrupt phrase
    pub resubmit_after_stop_ms: u64,
    /// Window in which an identical utterance is dropped as a duplicate
    pub dedupe_window_ms: u64,
    /// Cadence of the restart check while not speaking
    pub idle_watchdog_ms: u64,
    /// Cadence of the recognizer-health check during speech
    pub speaking_watchdog_ms: u64,
    /// Minimum gap between recognizer kicks
    pub kick_min_gap_ms: u64,
    /// Pause between a kick's stop and restart
    pub kick_restart_delay_ms: u64,
    /// Recognizer is considered stale after this long without events
    pub recognizer_stale_ms: u64,
    /// Delay before the filler acknowledgement on the buffered path
    pub filler_delay_ms: u64,
    /// History window, in user/assistant pairs
    pub max_turn_pairs: usize,
}

impl Default for TurnControllerConfig {
    fn default() -> Self {
        Self {
            silence_submit_ms: 1_000,
            thinking_submit_ms: 450,
            interrupt_submit_ms: 250,
            resubmit_after_stop_ms: 500,
            dedupe_window_ms: 1_200,
            idle_watchdog_ms: 700,
            speaking_watchdog_ms: 550,
            kick_min_gap_ms: 900,
            kick_restart_delay_ms: 80,
            recognizer_stale_ms: 1_400,
            filler_delay_ms: 650,
            max_turn_pairs: DEFAULT_MAX_TURN_PAIRS,
        }
    }
}

enum ReplyEvent {
    Delta(String),
    Filler,
    Done(String),
    Failed(String),
    SpokenAll,
}

enum Event {
    Recognition(RecognitionEvent),
    Reply { id: u64, event: ReplyEvent },
    Enable,
    Disable,
}

/// Handle to a running controller. Dropping it tears the loop down.
#[derive(Debug)]
pub struct TurnControllerHandle {
    events: mpsc::UnboundedSender<Event>,
    state_rx: watch::Receiver<TurnState>,
    task: JoinHandle<()>,
    forwarder: Option<JoinHandle<()>>,
}

impl TurnControllerHandle {
    /// Turn conversation mode on
    pub fn enable(&self) {
        let _ = self.events.send(Event::Enable);
    }

    /// Turn conversation mode off, stopping speech and recognition
    pub fn disable(&self) {
        let _ = self.events.send(Event::Disable);
    }

    /// Current phase of the loop
    pub fn state(&self) -> TurnState {
        *self.state_rx.borrow()
    }

    /// Watch phase changes
    pub fn subscribe(&self) -> watch::Receiver<TurnState> {
        self.state_rx.clone()
    }
}

impl Drop for TurnControllerHandle {
    fn drop(&mut self) {
        self.task.abort();
        if let Some(forwarder) = self.forwarder.take() {
            forwarder.abort();
        }
    }
}

struct PendingSubmit {
    at: Instant,
    delay: Duration,
    allow_while_speaking: bool,
}

/// The event loop. Constructed through [`TurnController::spawn`].
pub struct TurnController {
    config: TurnControllerConfig,
    recognizer: Arc<dyn SpeechRecognizer>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    inference: Arc<dyn InferencePort>,
    queue: SpeechQueue,
    events_tx: mpsc::UnboundedSender<Event>,
    state_tx: watch::Sender<TurnState>,

    enabled: bool,
    state: TurnState,
    /// Whether a recognition session is currently open
    listening: bool,
    heard: String,
    pending_submit: Option<PendingSubmit>,
    restart_at: Option<Instant>,
    conversation: Conversation,
    /// What the assistant is saying right now, for echo comparison
    current_ai_speech: String,
    chunker: SpeechChunker,
    last_submitted: Option<(String, Instant)>,
    last_kick_at: Option<Instant>,
    last_rec_event_at: Instant,
    request_id: u64,
    inference_task: Option<JoinHandle<()>>,
}

impl TurnController {
    /// Wire the loop to its devices and model port and start it.
    #[must_use]
    pub fn spawn(
        recognizer: Arc<dyn SpeechRecognizer>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        inference: Arc<dyn InferencePort>,
        config: TurnControllerConfig,
    ) -> TurnControllerHandle {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(TurnState::Idle);

        // Recognition events are pumped into the same channel as
        // everything else.
        let forwarder = recognizer.subscribe().map(|mut rec_rx| {
            let tx = events_tx.clone();
            tokio::spawn(async move {
                while let Some(event) = rec_rx.recv().await {
                    if tx.send(Event::Recognition(event)).is_err() {
                        break;
                    }
                }
            })
        });

        let controller = Self {
            queue: SpeechQueue::new(Arc::clone(&synthesizer)),
            conversation: Conversation::with_system_prompt(SYSTEM_PROMPT),
            events_tx: events_tx.clone(),
            state_tx,
            enabled: false,
            state: TurnState::Idle,
            listening: false,
            heard: String::new(),
            pending_submit: None,
            restart_at: None,
            current_ai_speech: String::new(),
            chunker: SpeechChunker::new(),
            last_submitted: None,
            last_kick_at: None,
            last_rec_event_at: Instant::now(),
            request_id: 0,
            inference_task: None,
            config,
            recognizer,
            synthesizer,
            inference,
        };
        let task = tokio::spawn(controller.run(events_rx));

        TurnControllerHandle {
            events: events_tx,
            state_rx,
            task,
            forwarder,
        }
    }

    async fn run(mut self, mut events: mpsc::UnboundedReceiver<Event>) {
        let idle_period = Duration::from_millis(self.config.idle_watchdog_ms);
        let speaking_period = Duration::from_millis(self.config.speaking_watchdog_ms);
        let mut idle_ticker = interval_at(Instant::now() + idle_period, idle_period);
        let mut speaking_ticker = interval_at(Instant::now() + speaking_period, speaking_period);

        loop {
            let submit_at = self.pending_submit.as_ref().map(|p| p.at);
            let restart_at = self.restart_at;
            tokio::select! {
                maybe = events.recv() => match maybe {
                    Some(event) => self.handle_event(event).await,
                    None => break,
                },
                () = wait_until(submit_at) => self.fire_submit().await,
                () = wait_until(restart_at) => {
                    self.restart_at = None;
                    self.start_recognition().await;
                },
                _ = idle_ticker.tick() => self.idle_watchdog().await,
                _ = speaking_ticker.tick() => self.speaking_watchdog().await,
            }
        }
        self.abort_inference();
    }

    async fn handle_event(&mut self, event: Event) {
        match event {
            Event::Enable => self.enable(),
            Event::Disable => self.disable().await,
            Event::Recognition(event) if self.enabled => self.handle_recognition(event).await,
            Event::Recognition(_) => {}
            Event::Reply { id, event } => {
                // Replies from a superseded request are dropped.
                if id == self.request_id {
                    self.handle_reply(event).await;
                }
            }
        }
    }

    fn enable(&mut self) {
        if self.enabled {
            return;
        }
        info!("conversation mode on");
        self.enabled = true;
        self.set_state(TurnState::Listening);
        self.restart_at = Some(Instant::now());
    }

    async fn disable(&mut self) {
        if !self.enabled {
            return;
        }
        info!("conversation mode off");
        self.enabled = false;
        self.abort_inference();
        self.queue.cancel_all();
        self.heard.clear();
        self.pending_submit = None;
        self.restart_at = None;
        self.current_ai_speech.clear();
        if let Err(err) = self.recognizer.stop().await {
            debug!(error = %err, "recognizer stop failed");
        }
        self.listening = false;
        self.set_state(TurnState::Idle);
    }

    async fn handle_recognition(&mut self, event: RecognitionEvent) {
        self.last_rec_event_at = Instant::now();
        match event {
            RecognitionEvent::Started => {
                self.heard.clear();
                self.pending_submit = None;
                self.listening = true;
            }
            RecognitionEvent::Ended => {
                self.listening = false;
                if self.heard.trim().is_empty() {
                    self.schedule_restart(150);
                } else {
                    self.schedule_submit(self.config.silence_submit_ms, false);
                }
            }
            RecognitionEvent::Error(message) => {
                debug!(error = %message, "recognition error");
                self.listening = false;
                // Errors are routine while the speakers are playing; come
                // back quickly so commands keep working.
                if self.speech_active() {
                    self.kick_recognition().await;
                    self.schedule_restart(120);
                } else {
                    self.schedule_restart(800);
                }
            }
            RecognitionEvent::Transcript(transcript) => {
                if transcript.is_final {
                    self.on_final(&transcript).await;
                } else {
                    self.on_interim(&transcript.text).await;
                }
            }
        }
    }

    /// Interim results drive barge-in: they arrive while the user is still
    /// talking, which is exactly when speech needs to stop.
    async fn on_interim(&mut self, text: &str) {
        if self.speech_active() {
            if let Some(cmd) = parse_voice_command(text) {
                self.handle_command(cmd).await;
                return;
            }
            if looks_like_echo(text, &self.current_ai_speech) {
                return;
            }
            // Real speech over the assistant's voice: cut off and listen.
            // No kick here; it can clip the user's first words.
            self.force_stop_to_listen(text, false, false).await;
            return;
        }

        if let Some(cmd) = parse_voice_command(text) {
            self.handle_command(cmd).await;
            return;
        }
        if self.state == TurnState::Thinking {
            // New speech supersedes the in-flight request.
            self.abort_inference();
        }
        self.heard = text.to_string();
        let delay = if self.state == TurnState::Thinking {
            self.config.thinking_submit_ms
        } else {
            self.config.silence_submit_ms
        };
        self.schedule_submit(delay, false);
    }

    async fn on_final(&mut self, transcript: &TranscriptEvent) {
        let text = transcript.text.as_str();
        if let Some(cmd) = parse_voice_command(text) {
            self.handle_command(cmd).await;
            return;
        }

        if self.speech_active() {
            let normalized = normalize(text);
            if is_interrupt_starter(&normalized) {
                let submit = !is_short_ack(&normalized);
                self.force_stop_to_listen(text, submit, true).await;
                return;
            }
            if !looks_like_echo(text, &self.current_ai_speech) {
                // Barge-in with a new topic: faster turn-taking.
                self.queue.cancel_all();
                self.current_ai_speech.clear();
                self.set_state(TurnState::Listening);
                self.heard = text.to_string();
                self.schedule_submit(self.config.interrupt_submit_ms, true);
            }
            return;
        }

        self.heard = text.to_string();
        self.schedule_submit(self.config.silence_submit_ms, false);
    }

    async fn handle_command(&mut self, cmd: VoiceCommand) {
        debug!(?cmd, "voice command");
        match cmd {
            VoiceCommand::Pause => {
                self.synthesizer.pause();
                self.kick_recognition().await;
            }
            VoiceCommand::Resume => {
                self.synthesizer.resume();
                self.kick_recognition().await;
            }
            VoiceCommand::Stop => {
                self.queue.cancel_all();
                self.abort_inference();
                self.heard.clear();
                self.pending_submit = None;
                self.current_ai_speech.clear();
                self.set_state(TurnState::Listening);
                self.schedule_restart(0);
                self.kick_recognition().await;
            }
        }
    }

    /// Cut off everything in flight and treat `text` as fresh user speech.
    async fn force_stop_to_listen(&mut self, text: &str, submit: bool, kick: bool) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        self.queue.cancel_all();
        self.current_ai_speech.clear();
        self.abort_inference();
        self.set_state(TurnState::Listening);
        self.heard = text.to_string();
        if submit {
            self.schedule_submit(self.config.resubmit_after_stop_ms, true);
        }
        self.schedule_restart(0);
        if kick {
            self.kick_recognition().await;
        }
    }

    fn schedule_submit(&mut self, delay_ms: u64, allow_while_speaking: bool) {
        let delay = Duration::from_millis(delay_ms);
        self.pending_submit = Some(PendingSubmit {
            at: Instant::now() + delay,
            delay,
            allow_while_speaking,
        });
    }

    fn schedule_restart(&mut self, delay_ms: u64) {
        self.restart_at = Some(Instant::now() + Duration::from_millis(delay_ms));
    }

    async fn fire_submit(&mut self) {
        let Some(pending) = self.pending_submit.take() else {
            return;
        };
        let text = self.heard.trim().to_string();
        if text.is_empty() {
            return;
        }

        // Continuous recognition can deliver the same utterance twice in
        // quick succession (interim then final, or across session restarts).
        let norm = text.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
        let now = Instant::now();
        if let Some((last, at)) = &self.last_submitted {
            if *last == norm && now.duration_since(*at).as_millis() < u128::from(self.config.dedupe_window_ms) {
                debug!("dropping duplicate utterance");
                self.heard.clear();
                return;
            }
        }

        // Hold the submit until speech stops, unless a barge-in already
        // authorized it.
        if !pending.allow_while_speaking && self.speech_active() {
            self.pending_submit = Some(PendingSubmit {
                at: now + pending.delay,
                ..pending
            });
            return;
        }

        self.last_submitted = Some((norm, now));
        self.heard.clear();
        self.submit_utterance(text).await;
    }

    #[instrument(skip_all)]
    async fn submit_utterance(&mut self, text: String) {
        let mut content = text.clone();

        if let Some(name) = extract_name(&text) {
            info!(name = %name, "captured user name");
            let rest = strip_name_intro(&text);
            self.conversation.set_user_name(name.clone());
            if rest.is_empty() {
                // Name-only input: acknowledge without a model round-trip.
                let _ = self.queue.enqueue(Utterance::new(format!("Okay, {name}.")));
                self.set_state(TurnState::Listening);
                self.schedule_restart(0);
                return;
            }
            content = rest;
        }

        // A new topic displaces whatever is playing or in flight.
        self.queue.cancel_all();
        self.current_ai_speech.clear();
        self.chunker = SpeechChunker::new();
        self.abort_inference();
        self.set_state(TurnState::Thinking);

        self.conversation.push_user(content);
        self.conversation.trim_to_window(self.config.max_turn_pairs);

        self.request_id += 1;
        let id = self.request_id;
        let task = tokio::spawn(run_inference(
            Arc::clone(&self.inference),
            self.conversation.clone(),
            self.events_tx.clone(),
            id,
            Duration::from_millis(self.config.filler_delay_ms),
        ));
        self.inference_task = Some(task);
    }

    async fn handle_reply(&mut self, event: ReplyEvent) {
        match event {
            ReplyEvent::Delta(delta) => {
                self.current_ai_speech.push_str(&delta);
                if self.state == TurnState::Thinking {
                    // First token: speech starts, and the mic stays open so
                    // "stop" works immediately.
                    self.set_state(TurnState::Speaking);
                    self.schedule_restart(0);
                }
                if let Some(chunk) = self.chunker.push(&delta) {
                    if let Some(text) = speakable(&chunk) {
                        let _ = self.queue.enqueue(Utterance::new(text));
                    }
                }
            }
            ReplyEvent::Filler => {
                if self.state == TurnState::Thinking {
                    self.set_state(TurnState::Speaking);
                    self.schedule_restart(0);
                    let _ = self.queue.enqueue(Utterance::new(THINKING_FILLER));
                }
            }
            ReplyEvent::Done(full) => self.on_reply_done(full).await,
            ReplyEvent::Failed(message) => self.on_reply_failed(message).await,
            ReplyEvent::SpokenAll => {
                // The reply (or spoken error) finished playing.
                self.current_ai_speech.clear();
                if self.enabled {
                    self.set_state(TurnState::Listening);
                    self.schedule_restart(0);
                }
            }
        }
    }

    async fn on_reply_done(&mut self, full: String) {
        self.inference_task = None;
        let final_text = full.trim().to_string();
        self.conversation.push_assistant(if final_text.is_empty() {
            "(No response)"
        } else {
            final_text.as_str()
        });
        self.current_ai_speech.clone_from(&final_text);

        if let Some(chunk) = self.chunker.flush() {
            if let Some(text) = speakable(&chunk) {
                let _ = self.queue.enqueue(Utterance::new(text));
            }
        }
        // A reply that streamed no speakable chunks is spoken whole.
        if !self.chunker.has_spoken() {
            if let Some(text) = speakable(&final_text) {
                self.set_state(TurnState::Speaking);
                self.schedule_restart(0);
                let _ = self.queue.enqueue(Utterance::new(text));
            }
        }
        self.watch_queue_drained();
    }

    async fn on_reply_failed(&mut self, message: String) {
        self.inference_task = None;
        warn!(error = %message, "turn failed");
        self.queue.cancel_all();
        let spoken = if message.trim().is_empty() {
            FALLBACK_ERROR_MESSAGE.to_string()
        } else {
            message
        };
        self.current_ai_speech.clone_from(&spoken);
        self.set_state(TurnState::Speaking);
        self.schedule_restart(0);
        let _ = self.queue.enqueue(Utterance::new(spoken));
        self.watch_queue_drained();
    }

    /// Post `SpokenAll` once everything queued so far has played out.
    fn watch_queue_drained(&self) {
        let ticket = self.queue.enqueue(Utterance::new(""));
        let tx = self.events_tx.clone();
        let id = self.request_id;
        tokio::spawn(async move {
            let _ = ticket.outcome().await;
            let _ = tx.send(Event::Reply {
                id,
                event: ReplyEvent::SpokenAll,
            });
        });
    }

    fn abort_inference(&mut self) {
        if let Some(task) = self.inference_task.take() {
            task.abort();
        }
    }

    fn speech_active(&self) -> bool {
        self.state == TurnState::Speaking || self.synthesizer.is_speaking()
    }

    async fn start_recognition(&mut self) {
        if !self.enabled || self.listening || self.pending_submit.is_some() {
            return;
        }
        // Device-level speech without the controller speaking means some
        // other audio is playing; stay out of its way.
        if self.synthesizer.is_speaking() && self.state != TurnState::Speaking {
            return;
        }
        if let Err(err) = self.recognizer.start().await {
            debug!(error = %err, "recognizer start failed");
        }
    }

    /// Recognizers go quiet after repeated cancels and interrupts. A short
    /// stop-then-start brings them back; rate-limited because doing it too
    /// often has the opposite effect.
    async fn kick_recognition(&mut self) {
        if !self.enabled {
            return;
        }
        let now = Instant::now();
        if self
            .last_kick_at
            .is_some_and(|at| now.duration_since(at).as_millis() < u128::from(self.config.kick_min_gap_ms))
        {
            return;
        }
        self.last_kick_at = Some(now);
        if let Err(err) = self.recognizer.stop().await {
            debug!(error = %err, "recognizer stop failed");
        }
        self.listening = false;
        self.restart_at = Some(now + Duration::from_millis(self.config.kick_restart_delay_ms));
    }

    async fn idle_watchdog(&mut self) {
        if !self.enabled || self.listening || self.pending_submit.is_some() {
            return;
        }
        self.start_recognition().await;
    }

    async fn speaking_watchdog(&mut self) {
        if !self.enabled || !self.speech_active() || self.pending_submit.is_some() {
            return;
        }
        let stale = Instant::now().duration_since(self.last_rec_event_at).as_millis()
            > u128::from(self.config.recognizer_stale_ms);
        if !self.listening || stale {
            self.kick_recognition().await;
        }
    }

    fn set_state(&mut self, state: TurnState) {
        if self.state != state {
            debug!(from = ?self.state, to = ?state, "state change");
            self.state = state;
            let _ = self.state_tx.send(state);
        }
    }
}

async fn wait_until(at: Option<Instant>) {
    match at {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}

/// Drive one model request off the loop task. Streaming is tried first;
/// if it cannot produce anything, one buffered call follows, with a short
/// spoken filler if that call is slow. Aborting the task cancels the
/// upstream request.
async fn run_inference(
    inference: Arc<dyn InferencePort>,
    conversation: Conversation,
    tx: mpsc::UnboundedSender<Event>,
    id: u64,
    filler_delay: Duration,
) {
    let send = |event: ReplyEvent| {
        let _ = tx.send(Event::Reply { id, event });
    };

    match inference.generate_stream(&conversation).await {
        Ok(mut stream) => {
            let mut full = String::new();
            let mut stream_error = None;
            while let Some(item) = stream.next().await {
                match item {
                    Ok(delta) if delta.is_empty() => {}
                    Ok(delta) => {
                        full.push_str(&delta);
                        send(ReplyEvent::Delta(delta));
                    }
                    Err(err) => {
                        stream_error = Some(err);
                        break;
                    }
                }
            }
            match stream_error {
                None => {
                    send(ReplyEvent::Done(full));
                    return;
                }
                Some(err) if err.is_cancelled() => return,
                Some(err) => {
                    // Fall back to a buffered call only if nothing streamed;
                    // re-answering after partial speech repeats the reply.
                    if !full.is_empty() {
                        send(ReplyEvent::Failed(err.to_string()));
                        return;
                    }
                    debug!(error = %err, "stream failed, using buffered call");
                }
            }
        }
        Err(err) if err.is_cancelled() => return,
        Err(err) => {
            debug!(error = %err, "streaming unavailable, using buffered call");
        }
    }

    // Buffered fallback. The filler speaks if the reply takes noticeably
    // long, so the user knows they were heard.
    let filler = {
        let tx = tx.clone();
        tokio::spawn(async move {
            sleep(filler_delay).await;
            let _ = tx.send(Event::Reply {
                id,
                event: ReplyEvent::Filler,
            });
        })
    };
    let result = inference.generate(&conversation).await;
    filler.abort();
    match result {
        Ok(text) => send(ReplyEvent::Done(text)),
        Err(err) if err.is_cancelled() => {}
        Err(err) => send(ReplyEvent::Failed(err.to_string())),
    }
}
