// Thu Oct 15 2026 - Alex

//! Signatures for the Discord voice engine module (`discord_voice.node`,
//! x86-64 builds). Each pattern covers the first instructions of the target
//! function; register encodings and displacements that move between builds
//! are wildcarded.

use crate::catalog::SignatureDef;
use once_cell::sync::Lazy;

pub const BUILTIN_VERSION: &str = "discord-voice-x64-1";

pub static BUILTIN_SIGNATURES: Lazy<Vec<SignatureDef>> = Lazy::new(|| {
    vec![
        SignatureDef::new(
            "create_audio_frame_stereo",
            "CreateAudioFrameStereo",
            "48 89 5C 24 ?? 48 89 74 24 ?? 57 48 83 EC 30 49 8B F9 41 8B D8",
        ),
        SignatureDef::new(
            "audio_encoder_opus_config_set_channels",
            "AudioEncoderOpusConfigSetChannels",
            "48 8B 01 48 8B 40 ?? FF 15 ?? ?? ?? ?? 83 F8 01 74 ??",
        ),
        SignatureDef::new(
            "mono_downmixer",
            "MonoDownmixer",
            "84 C0 74 ?? 83 BE ?? ?? ?? ?? 09 0F 8F",
        ),
        SignatureDef::new(
            "emulate_stereo_success_1",
            "EmulateStereoSuccess1",
            "C7 44 24 ?? 01 00 00 00 BA 02 00 00 00",
        ),
        SignatureDef::new(
            "emulate_stereo_success_2",
            "EmulateStereoSuccess2",
            "48 C7 43 ?? 01 00 00 00 E9 ?? ?? ?? ??",
        )
        .with_min_score(0.3),
        SignatureDef::new(
            "emulate_bitrate_modified",
            "EmulateBitrateModified",
            "41 B8 00 7D 00 00 48 8B CB E8 ?? ?? ?? ??",
        ),
        SignatureDef::new(
            "sets_bitrate_bitrate_value",
            "SetsBitrateBitrateValue",
            "48 B8 ?? ?? ?? ?? 00 7D 00 00 48 89 43 ??",
        )
        .with_min_score(0.3),
        SignatureDef::new(
            "sets_bitrate_bitwise_or",
            "SetsBitrateBitwiseOr",
            "48 09 C1 48 89 4B ?? 48 8B 5C 24 ??",
        ),
        SignatureDef::new(
            "emulate_48khz",
            "Emulate48Khz",
            "B8 80 BB 00 00 0F 42 C8",
        ),
        SignatureDef::new(
            "high_pass_filter",
            "HighPassFilter",
            "48 8B 0D ?? ?? ?? ?? 48 85 C9 74 ?? E8 ?? ?? ?? ?? 48 8B",
        )
        .with_min_score(0.3),
        SignatureDef::new(
            "highpass_cutoff_filter",
            "HighpassCutoffFilter",
            "F3 0F 10 05 ?? ?? ?? ?? F3 0F 59 C1 F3 0F 11 43 ??",
        ),
        SignatureDef::new(
            "dc_reject",
            "DcReject",
            "F3 0F 10 4B ?? F3 0F 5C C8 F3 0F 59 0D ?? ?? ?? ??",
        ),
        SignatureDef::new(
            "downmix_func",
            "DownmixFunc",
            "55 41 57 41 56 41 55 41 54 56 57 53 48 83 EC ?? 48 8D 6C 24 ??",
        ),
        SignatureDef::new(
            "audio_encoder_opus_config_is_ok",
            "AudioEncoderOpusConfigIsOk",
            "8B 11 31 C0 83 FA 08 77 ?? 8B 49 ?? 85 C9",
        ),
        SignatureDef::new(
            "throw_error",
            "ThrowError",
            "48 89 5C 24 08 57 48 83 EC 20 48 8B D9 48 8B FA E8 ?? ?? ?? ??",
        ),
    ]
});
