//! Reward-to-action routing.

use std::sync::Arc;
use std::time::Duration;

use crate::cache::ScrolloCache;
use crate::error::Result;
use crate::executor::{ActionCommand, ActionGroup, CommandRunner};
use crate::lighting::LightController;
use crate::reward::{LightSelection, Reward, roll_rare_sound};

/// Transition used for bulb colour changes.
pub const LIGHT_TRANSITION: Duration = Duration::from_millis(1);

/// Commands and files used by the process-launching rewards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionSettings {
    /// Process name passed to `killall` for "end the stream".
    pub stream_process: String,
    /// Script run for "silence me".
    pub silence_script: String,
    pub sound_default: String,
    pub sound_rare: String,
    /// Value of `AUDIODEV` for sound playback.
    pub audio_device: String,
}

impl Default for ActionSettings {
    fn default() -> Self {
        Self {
            stream_process: "obs".to_string(),
            silence_script: "./silencethot.sh".to_string(),
            sound_default: "woof.mp3".to_string(),
            sound_rare: "bark.mp3".to_string(),
            audio_device: "hw:1,0".to_string(),
        }
    }
}

impl ActionSettings {
    pub fn end_stream_command(&self) -> ActionCommand {
        ActionCommand::new("end the stream", "killall").arg(&self.stream_process)
    }

    pub fn silence_command(&self) -> ActionCommand {
        ActionCommand::new("silence me", &self.silence_script)
    }

    pub fn sound_command(&self, rare: bool) -> ActionCommand {
        let sound = if rare {
            &self.sound_rare
        } else {
            &self.sound_default
        };
        ActionCommand::new("play sound", "play")
            .arg(sound)
            .env("AUDIODEV", &self.audio_device)
    }
}

/// Maps redeemed rewards to their side effects.
pub struct RewardRouter {
    lights: Arc<dyn LightController>,
    runner: Arc<dyn CommandRunner>,
    cache: ScrolloCache,
    settings: ActionSettings,
}

impl RewardRouter {
    pub fn new(
        lights: Arc<dyn LightController>,
        runner: Arc<dyn CommandRunner>,
        cache: ScrolloCache,
        settings: ActionSettings,
    ) -> Self {
        Self {
            lights,
            runner,
            cache,
            settings,
        }
    }

    pub fn cache(&self) -> &ScrolloCache {
        &self.cache
    }

    /// Runs the action for `reward_title`, if any, and waits for it.
    ///
    /// Launched commands are joined before returning; the first failure is
    /// reported. The lighting call and the cache step run inline.
    pub async fn dispatch(&self, reward_title: &str, user_input: &str) -> Result<()> {
        let reward = Reward::from_title(reward_title);
        let mut actions = ActionGroup::new(Arc::clone(&self.runner));
        let mut inline_result = Ok(());

        match reward {
            Reward::Lights => {
                let selection = LightSelection::from_input(user_input);
                tracing::info!("Setting bulb {} to {}", selection.slot, selection.color.hue);
                inline_result = self
                    .lights
                    .set_color(selection.slot, selection.color, LIGHT_TRANSITION)
                    .await;
            }
            Reward::EndStream => {
                tracing::info!("Killing stream");
                actions.spawn(self.settings.end_stream_command());
            }
            Reward::SilenceMe => {
                tracing::info!("Silencing");
                actions.spawn(self.settings.silence_command());
            }
            Reward::SimpBucksPremium => {
                let rare = roll_rare_sound(&mut rand::thread_rng());
                tracing::info!("Playing {} sound", if rare { "rare" } else { "default" });
                actions.spawn(self.settings.sound_command(rare));
            }
            Reward::Scrollo => {
                inline_result = self.cache.ensure_and_link(user_input).await.map(|entry| {
                    tracing::info!("Scrollo now showing {}", entry.display());
                });
            }
            Reward::Unknown(title) => {
                tracing::debug!("Ignoring unknown reward {:?}", title);
            }
        }

        let joined = actions.wait().await;
        inline_result.and(joined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RedeemError;
    use crate::lighting::{BulbSlot, Hsbk};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingLights {
        calls: Mutex<Vec<(BulbSlot, Hsbk)>>,
        fail: bool,
    }

    #[async_trait]
    impl LightController for RecordingLights {
        async fn set_color(&self, slot: BulbSlot, color: Hsbk, _transition: Duration) -> Result<()> {
            self.calls.lock().unwrap().push((slot, color));
            if self.fail {
                return Err(RedeemError::Lighting("unreachable".to_string()));
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingRunner {
        commands: Mutex<Vec<ActionCommand>>,
    }

    #[async_trait]
    impl CommandRunner for RecordingRunner {
        async fn run(&self, command: &ActionCommand) -> Result<()> {
            self.commands.lock().unwrap().push(command.clone());
            Ok(())
        }
    }

    struct Fixture {
        _tmp: TempDir,
        lights: Arc<RecordingLights>,
        runner: Arc<RecordingRunner>,
        router: RewardRouter,
    }

    fn fixture_with(lights: RecordingLights) -> Fixture {
        let tmp = TempDir::new().unwrap();
        let cache_dir = tmp.path().join("cache");
        std::fs::create_dir_all(&cache_dir).unwrap();
        let cache = ScrolloCache::new(cache_dir, tmp.path().join("scrollo.txt"));
        let lights = Arc::new(lights);
        let runner = Arc::new(RecordingRunner::default());
        let router = RewardRouter::new(
            lights.clone(),
            runner.clone(),
            cache,
            ActionSettings::default(),
        );
        Fixture {
            _tmp: tmp,
            lights,
            runner,
            router,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(RecordingLights::default())
    }

    #[tokio::test]
    async fn test_lights_numeric_input() {
        let f = fixture();
        f.router.dispatch("lights", "100").await.unwrap();

        let calls = f.lights.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, BulbSlot::Bed);
        assert_eq!(calls[0].1.hue, 100);
        assert_eq!(calls[0].1.kelvin, 3200);
        assert!(f.runner.commands.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_lights_text_input_is_deterministic() {
        let f = fixture();
        f.router.dispatch("lights", "purple").await.unwrap();
        f.router.dispatch("lights", "purple").await.unwrap();

        let calls = f.lights.calls.lock().unwrap();
        assert_eq!(calls[0], calls[1]);
        assert_eq!(calls[0], {
            let s = LightSelection::from_input("purple");
            (s.slot, s.color)
        });
    }

    #[tokio::test]
    async fn test_lights_failure_is_reported() {
        let f = fixture_with(RecordingLights {
            fail: true,
            ..Default::default()
        });
        let err = f.router.dispatch("lights", "1").await.unwrap_err();
        assert!(matches!(err, RedeemError::Lighting(_)));
    }

    #[tokio::test]
    async fn test_end_stream_launches_killall() {
        let f = fixture();
        f.router.dispatch("end the stream", "").await.unwrap();

        let commands = f.runner.commands.lock().unwrap();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].program, "killall");
        assert_eq!(commands[0].args, vec!["obs".to_string()]);
    }

    #[tokio::test]
    async fn test_silence_runs_script_without_args() {
        let f = fixture();
        f.router.dispatch("silence me", "ignored").await.unwrap();

        let commands = f.runner.commands.lock().unwrap();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].program, "./silencethot.sh");
        assert!(commands[0].args.is_empty());
    }

    #[tokio::test]
    async fn test_simpbucks_plays_a_sound_on_audio_device() {
        let f = fixture();
        f.router.dispatch("SimpBucks Premium", "").await.unwrap();

        let commands = f.runner.commands.lock().unwrap();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].program, "play");
        assert!(
            commands[0].args == vec!["woof.mp3".to_string()]
                || commands[0].args == vec!["bark.mp3".to_string()]
        );
        assert_eq!(commands[0].env.get("AUDIODEV").map(String::as_str), Some("hw:1,0"));
    }

    #[tokio::test]
    async fn test_scrollo_writes_cache_without_processes() {
        let f = fixture();
        f.router.dispatch("scrollo", "hello").await.unwrap();

        let entry = f.router.cache().entry_path("hello");
        assert_eq!(std::fs::read_to_string(&entry).unwrap(), " hello ✨✨✨ ");
        assert_eq!(
            std::fs::read_to_string(f.router.cache().link_path()).unwrap(),
            " hello ✨✨✨ "
        );
        assert!(f.runner.commands.lock().unwrap().is_empty());
        assert!(f.lights.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_reward_is_noop() {
        let f = fixture();
        f.router.dispatch("Lights", "100").await.unwrap();
        f.router.dispatch("hydrate", "").await.unwrap();

        assert!(f.runner.commands.lock().unwrap().is_empty());
        assert!(f.lights.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_sound_command_selection() {
        let settings = ActionSettings::default();
        assert_eq!(settings.sound_command(true).args, vec!["bark.mp3".to_string()]);
        assert_eq!(settings.sound_command(false).args, vec!["woof.mp3".to_string()]);
    }
}
