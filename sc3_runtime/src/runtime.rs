use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, info};
use sc3_project::{GameConfig, Project, VmSection};
use sc3_scene::{AssetSource, DirectorySource, LoadCoordinator, LoaderWorkers, Scene};
use sc3_vm::{InstructionSet, MAX_SCRIPT_BUFFERS, ScriptSource, TickReport, Vm, VmOptions};

use crate::error::RuntimeError;
use crate::source::DirectoryScriptSource;

/// Where a runtime reads scripts and assets from.
#[derive(Clone)]
pub struct RuntimeSources {
    pub scripts: Arc<dyn ScriptSource>,
    pub assets: Arc<dyn AssetSource>,
}

impl RuntimeSources {
    /// `<root>/script/<id>.scx` for scripts, the configured asset root for models.
    pub fn for_project(project: &Project) -> Self {
        Self {
            scripts: Arc::new(DirectoryScriptSource::new(&project.root)),
            assets: Arc::new(DirectorySource::new(project.asset_root())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub frame: u64,
    pub tick: TickReport,
    pub loads_pending: bool,
}

pub struct Runtime {
    config: GameConfig,
    vm: Vm,
    scene: Scene,
    frame: u64,
}

impl Runtime {
    pub fn load(root: impl Into<PathBuf>) -> Result<Self, RuntimeError> {
        let project = Project::load(root)?;
        Self::from_project(&project)
    }

    pub fn from_project(project: &Project) -> Result<Self, RuntimeError> {
        Self::new(project.config.clone(), RuntimeSources::for_project(project))
    }

    /// Builds the VM and scene, loads the start script and queues its first thread.
    pub fn new(config: GameConfig, sources: RuntimeSources) -> Result<Self, RuntimeError> {
        let options = vm_options(&config.vm)?;
        let buffer = start_buffer(&config.vm)?;

        let workers = match config.assets.loader_threads {
            0 => LoaderWorkers::Inline,
            threads => LoaderWorkers::Pool { threads },
        };
        let scene = Scene::new(LoadCoordinator::new(sources.assets, workers)?);

        let mut vm = Vm::new(options, Some(sources.scripts));
        let id = config.vm.start_script;
        match vm.load_script_by_id(buffer, id) {
            Ok(true) => {}
            Ok(false) => return Err(RuntimeError::StartScriptMissing { id }),
            Err(source) => return Err(RuntimeError::StartScript { id, source }),
        }
        let thread = vm.spawn(buffer, config.vm.start_label)?;

        info!(
            "`{}` starting script {id} (buffer {buffer}, label {}) as thread {thread}",
            config.game.name, config.vm.start_label
        );

        Ok(Self {
            config,
            vm,
            scene,
            frame: 0,
        })
    }

    /// One frame: adopt finished loads, advance animation, then run scripts.
    pub fn update(&mut self, delta: f32) -> Result<FrameReport, RuntimeError> {
        self.scene.update(delta);
        let tick = self.vm.tick(delta, &mut self.scene)?;
        self.frame += 1;

        if tick.faulted > 0 {
            debug!("frame {}: {} thread(s) faulted", self.frame, tick.faulted);
        }

        Ok(FrameReport {
            frame: self.frame,
            tick,
            loads_pending: self.scene.loads().has_pending(),
        })
    }

    /// No script thread is left to run.
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.vm.live_threads() == 0
    }

    #[inline]
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    #[inline]
    pub fn vm(&self) -> &Vm {
        &self.vm
    }

    #[inline]
    pub fn vm_mut(&mut self) -> &mut Vm {
        &mut self.vm
    }

    #[inline]
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame
    }
}

pub fn vm_options(vm: &VmSection) -> Result<VmOptions, RuntimeError> {
    let instruction_set = InstructionSet::from_name(&vm.instruction_set)
        .ok_or_else(|| RuntimeError::UnknownInstructionSet(vm.instruction_set.clone()))?;
    Ok(VmOptions {
        instruction_set,
        use_return_ids: vm.use_return_ids,
        instructions_per_tick: vm.instructions_per_tick,
        max_threads: vm.max_threads,
    })
}

fn start_buffer(vm: &VmSection) -> Result<usize, RuntimeError> {
    let buffer = vm.start_script_buffer as usize;
    if buffer >= MAX_SCRIPT_BUFFERS {
        return Err(RuntimeError::StartBuffer {
            buffer: vm.start_script_buffer,
            max: MAX_SCRIPT_BUFFERS - 1,
        });
    }
    Ok(buffer)
}
