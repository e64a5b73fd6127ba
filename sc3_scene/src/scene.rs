//! Scene state the renderer reads: the current background and character buffers.
//! Only fully loaded resources are ever visible here.

use std::sync::Arc;

use log::{debug, info, warn};
use sc3_assets::{AnimationPlayer, BoneTransform, Model};
use sc3_bridge::{LoadStatus, SceneBridge, SlotKey};
use sc3_ids::LoadHandle;

use crate::coordinator::{Background3D, LoadCoordinator, LoadedResource};

/// Character buffers the scene can show.
pub const CHARACTER_BUFFER_COUNT: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AnimationIntent {
    animation: u16,
    playing: bool,
}

#[derive(Debug)]
pub struct CharacterInstance {
    model: Arc<Model>,
    player: Option<AnimationPlayer>,
    playing: bool,
}

impl CharacterInstance {
    fn new(model: Arc<Model>) -> Self {
        Self {
            model,
            player: None,
            playing: false,
        }
    }

    #[inline]
    pub fn model(&self) -> &Arc<Model> {
        &self.model
    }

    pub fn current_animation(&self) -> Option<u16> {
        self.player.as_ref().map(|p| p.animation().id)
    }

    #[inline]
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn pose(&self) -> Vec<BoneTransform> {
        match &self.player {
            Some(player) => player.sample(&self.model),
            None => self.model.bones.iter().map(BoneTransform::rest).collect(),
        }
    }

    fn apply(&mut self, intent: AnimationIntent) {
        let Some(animation) = self.model.animation(intent.animation) else {
            warn!(
                "character model {} has no animation {}",
                self.model.id, intent.animation
            );
            return;
        };
        self.player = Some(AnimationPlayer::new(Arc::clone(animation), true));
        self.playing = intent.playing;
    }

    fn advance(&mut self, delta: f32) {
        if !self.playing {
            return;
        }
        if let Some(player) = &mut self.player {
            player.advance(delta);
        }
    }
}

pub struct Scene {
    loads: LoadCoordinator,
    background: Option<Arc<Background3D>>,
    characters: Vec<Option<CharacterInstance>>,
    pending_animations: Vec<Option<AnimationIntent>>,
}

impl Scene {
    pub fn new(loads: LoadCoordinator) -> Self {
        let buffers = CHARACTER_BUFFER_COUNT as usize;
        Self {
            loads,
            background: None,
            characters: (0..buffers).map(|_| None).collect(),
            pending_animations: vec![None; buffers],
        }
    }

    #[inline]
    pub fn loads(&self) -> &LoadCoordinator {
        &self.loads
    }

    /// Adopts finished loads and advances animation. Runs once per frame before scripts.
    pub fn update(&mut self, delta: f32) {
        let report = self.loads.pump();
        if report.stale > 0 {
            debug!("scene dropped {} stale load results", report.stale);
        }
        self.sync_background();
        for buffer in 0..CHARACTER_BUFFER_COUNT {
            self.sync_character(buffer);
        }
        for character in self.characters.iter_mut().flatten() {
            character.advance(delta);
        }
    }

    fn sync_background(&mut self) {
        self.background = match self.loads.resource(SlotKey::BACKGROUND) {
            Some(LoadedResource::Background(bg)) => Some(Arc::clone(bg)),
            _ => None,
        };
    }

    fn sync_character(&mut self, buffer: u32) {
        let index = buffer as usize;
        let loaded = match self.loads.resource(SlotKey::character(buffer)) {
            Some(LoadedResource::Character(model)) => Some(Arc::clone(model)),
            _ => None,
        };
        let Some(model) = loaded else {
            self.characters[index] = None;
            return;
        };

        let current = self.characters[index]
            .as_ref()
            .is_some_and(|c| Arc::ptr_eq(c.model(), &model));
        if current {
            return;
        }

        let mut instance = CharacterInstance::new(model);
        if let Some(intent) = self.pending_animations[index].take() {
            instance.apply(intent);
        }
        self.characters[index] = Some(instance);
    }

    pub fn background(&self) -> Option<&Arc<Background3D>> {
        self.background.as_ref()
    }

    pub fn character(&self, buffer: u32) -> Option<&CharacterInstance> {
        self.characters.get(buffer as usize)?.as_ref()
    }

    pub fn character_pose(&self, buffer: u32) -> Option<Vec<BoneTransform>> {
        self.character(buffer).map(CharacterInstance::pose)
    }

    fn character_index(&self, buffer: u32, what: &str) -> Option<usize> {
        if buffer < CHARACTER_BUFFER_COUNT {
            Some(buffer as usize)
        } else {
            warn!("{what} on character buffer {buffer} ignored (only {CHARACTER_BUFFER_COUNT} supported)");
            None
        }
    }

    fn animation_intent(&mut self, buffer: u32, intent: AnimationIntent, what: &str) {
        let Some(index) = self.character_index(buffer, what) else {
            return;
        };
        if let Some(character) = &mut self.characters[index] {
            character.apply(intent);
            return;
        }
        match self.loads.slot_status(SlotKey::character(buffer)) {
            // Loaded but not adopted yet happens between pump and the next update.
            LoadStatus::Loading | LoadStatus::Loaded => {
                self.pending_animations[index] = Some(intent);
            }
            LoadStatus::Unloaded | LoadStatus::Failed => {
                warn!("{what} on empty character buffer {buffer} ignored");
            }
        }
    }
}

impl SceneBridge for Scene {
    fn request_load(&mut self, slot: SlotKey, asset_id: u32) -> LoadHandle {
        if slot != SlotKey::BACKGROUND {
            let Some(index) = self.character_index(slot.index, "load") else {
                return LoadHandle::nil();
            };
            self.pending_animations[index] = None;
        }
        info!(
            "requesting {} {} into slot {}",
            slot.category.name(),
            asset_id,
            slot.index
        );
        self.loads.request_load(slot, asset_id)
    }

    fn release(&mut self, slot: SlotKey) {
        self.loads.release(slot);
        if slot == SlotKey::BACKGROUND {
            self.background = None;
        } else if let Some(index) = self.character_index(slot.index, "release") {
            self.characters[index] = None;
            self.pending_animations[index] = None;
        }
    }

    fn slot_status(&self, slot: SlotKey) -> LoadStatus {
        self.loads.slot_status(slot)
    }

    fn poll_status(&self, handle: LoadHandle) -> LoadStatus {
        self.loads.poll_status(handle)
    }

    fn play_animation(&mut self, buffer: u32, animation: u16, mode: u8) {
        debug!("play animation {animation} on buffer {buffer} (mode {mode})");
        self.animation_intent(
            buffer,
            AnimationIntent {
                animation,
                playing: true,
            },
            "play animation",
        );
    }

    fn set_animation(&mut self, buffer: u32, animation: u16) {
        self.animation_intent(
            buffer,
            AnimationIntent {
                animation,
                playing: false,
            },
            "set animation",
        );
    }
}
