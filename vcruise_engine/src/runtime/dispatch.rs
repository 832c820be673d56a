//! Opcode to handler table.

use log::trace;

use super::ops::{anim, base, env, sound};
use super::Runtime;
use crate::script::{Instruction, ScriptError, ScriptOp};

pub(crate) type OpHandler = fn(&mut Runtime, Instruction) -> Result<(), ScriptError>;

pub(crate) fn execute(rt: &mut Runtime, instruction: Instruction) -> Result<(), ScriptError> {
    trace!("{} {}", instruction.op.name(), instruction.arg);
    handler(instruction.op)(rt, instruction)
}

/// Exhaustive over [`ScriptOp`]; a new opcode does not compile until it is
/// routed here.
pub(crate) fn handler(op: ScriptOp) -> OpHandler {
    use ScriptOp::*;
    match op {
        Number => base::number,
        String => base::string,
        Drop => base::drop,
        Dup => base::dup,
        Swap => base::swap,

        Add => base::add,
        Sub => base::sub,
        Mul => base::mul,
        Div => base::div,
        Mod => base::modulo,
        Negate => base::negate,
        Not => base::not,
        And => base::and,
        Or => base::or,
        CmpEq => base::cmp_eq,
        CmpNE => base::cmp_ne,
        CmpLt => base::cmp_lt,
        CmpLE => base::cmp_le,
        CmpGt => base::cmp_gt,
        CmpGE => base::cmp_ge,
        BitAnd => base::bit_and,
        BitOr => base::bit_or,
        BitLoad => base::bit_load,
        BitSet0 => base::bit_set0,
        BitSet1 => base::bit_set1,
        ExtractByte => base::extract_byte,
        InsertByte => base::insert_byte,
        GetDigit => base::get_digit,

        VarLoad => base::var_load,
        VarStore => base::var_store,
        VarAddAndStore => base::var_add_and_store,
        VarGlobalLoad => base::var_global_load,
        VarGlobalStore => base::var_global_store,
        LoSet => base::lo_set,
        LoGet => base::lo_get,
        HiSet => base::hi_set,
        HiGet => base::hi_get,

        CheckValue => base::check_value,
        Jump => base::jump,
        Goto => base::goto,
        Fn => base::call_function,
        Return => base::return_from_function,

        ItemCheck => env::item_check,
        ItemRemove => env::item_remove,
        ItemHighlightSet => env::item_highlight_set,
        ItemHighlightSetTrue => env::item_highlight_set_true,
        ItemAdd => env::item_add,
        ItemHaveSpace => env::item_have_space,
        ItemClear => env::item_clear,
        SetCursor => env::set_cursor,
        LMB => env::lmb,
        LMB1 => env::lmb1,

        SoundS1 => sound::sound_s1,
        SoundS2 => sound::sound_s2,
        SoundS3 => sound::sound_s3,
        SoundL1 => sound::sound_l1,
        SoundL2 => sound::sound_l2,
        SoundL3 => sound::sound_l3,
        Sound3DS2 => sound::sound_3d_s2,
        Sound3DL2 => sound::sound_3d_l2,
        Range => sound::range,
        StopAL => sound::stop_al,
        StopSndLA => sound::stop_snd_la,
        StopSndLO => sound::stop_snd_lo,
        VolumeDn2 => sound::volume_dn2,
        VolumeDn3 => sound::volume_dn3,
        VolumeDn4 => sound::volume_dn4,
        VolumeUp3 => sound::volume_up3,
        AddXSound => sound::add_x_sound,
        ClrXSound => sound::clr_x_sound,
        SndAddRandom => sound::snd_add_random,
        SndClearRandom => sound::clr_x_sound,

        SndPlay => sound::snd_play,
        SndPlayEx => sound::snd_play_ex,
        SndPlay3D => sound::snd_play_3d,
        SndPlaying => sound::snd_playing,
        SndWait => sound::snd_wait,
        SndHalt => sound::snd_halt,
        SndToBack => sound::snd_to_back,
        SndStop => sound::snd_stop,
        SndStopAll => sound::stop_al,
        VolumeAdd => sound::volume_add,
        VolumeChange => sound::volume_change,

        Music => sound::music,
        MusicVolRamp => sound::music_vol_ramp,
        MusicStop => sound::music_stop,
        MusicPlayScore => sound::music_play_score,
        ScoreAlways => sound::score_always,
        ScoreNormal => sound::score_normal,

        Say1 => sound::say1,
        Say2 => sound::say2,
        Say3 => sound::say3,
        Say3Get => sound::say3_get,
        Speech => sound::speech,
        SpeechEx => sound::speech_ex,
        SpeechTest => sound::speech_test,
        Dubbing => sound::dubbing,

        Anim => anim::anim,
        AnimS => anim::anim_s,
        AnimF => anim::anim_f,
        AnimN => anim::anim_n,
        AnimG => anim::anim_g,
        AnimR => anim::anim_r,
        Static => anim::static_frame,
        SAnimL => anim::s_anim_l,
        ChangeL => anim::change_l,
        AnimChange => anim::anim_change,
        AnimVolume => anim::anim_volume,
        Speed => anim::speed,
        Rotate => anim::rotate,
        RotateUpdate => anim::rotate_update,

        Parm0 => anim::parm0,
        Parm1 => anim::parm1,
        Parm2 => anim::parm2,
        Parm3 => anim::parm3,
        ParmG => anim::parm_g,
        AngleGGet => anim::angle_g_get,

        SParmX => anim::s_parm_x,
        SAnimX => anim::s_anim_x,

        Angle => env::angle,
        AngleGet => env::angle_get,
        EscOn => env::esc_on,
        EscOff => env::esc_off,
        EscGet => env::esc_get,
        SetTimer => env::set_timer,
        GetTimer => env::get_timer,
        Delay => env::delay,
        Random => env::random,
        RandomInclusive => env::random_inclusive,
        SetRoom => env::set_room,
        GetRoom => env::get_room,
        Disc1 => env::disc1,
        Disc2 => env::disc2,
        Disc3 => env::disc3,
        IsCDVersion => env::is_cd_version,
        IsDVDVersion => env::is_dvd_version,
        HidePanel => env::hide_panel,
        AllowSaves => env::allow_saves,
        Save0 => env::save0,
        SaveAs => env::save0,
        BackStart => env::back_start,
        Exit => env::exit,

        HeroOut => env::hero_out,
        HeroGet => env::hero_get,
        HeroGetPos => env::hero_get_pos,
        HeroSetPos => env::hero_set_pos,

        AnimName => base::anim_name,
        ValueName => base::value_name,
        VarName => base::var_name,
        SoundName => base::sound_name,
        CursorName => base::cursor_name,
        ScreenName => base::screen_name,

        Garbage | PuzzleInit | PuzzleCanPress | PuzzleDoMove1 | PuzzleDoMove2 | PuzzleDone
        | PuzzleWhoWon => unimplemented,
    }
}

fn unimplemented(_rt: &mut Runtime, instruction: Instruction) -> Result<(), ScriptError> {
    Err(ScriptError::Unimplemented {
        op: instruction.op.name(),
    })
}

