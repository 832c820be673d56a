pub mod savegame;

pub use savegame::{
    PendingStaticAnimParams, SAVE_GAME_CURRENT_VERSION, SAVE_GAME_EARLIEST_SUPPORTED_VERSION,
    SAVE_GAME_IDENTIFIER, SaveError, SaveGameSnapshot, SavedAmbientSound, SavedAnimationRange,
    SavedInventoryItem, SavedSound, SoundParams3D, SwappableState, TriggeredOneShot,
    read_save_file, write_save_file,
};
