use crate::composition::batch::CompositionJob;
use crate::composition::mode::ExecutionMode;
use crate::composition::plan::{ExecutionPlan, StagingNames, SupportFile};
use crate::config::{AudioProfile, EncoderConfig};

/// Graph output labels; every plan maps exactly these two streams
pub const VIDEO_OUT: &str = "[outv]";
pub const AUDIO_OUT: &str = "[outa]";

/// Builds FFmpeg filter graphs and argument vectors for each execution mode
///
/// Inputs are always ordered lead (`0`), body (`1`), then BGM (`2`) when
/// present, and the concat filter always takes the lead first.
#[derive(Debug, Clone, Default)]
pub struct FilterGraphCompiler {
    encoder: EncoderConfig,
}

impl FilterGraphCompiler {
    pub fn new(encoder: EncoderConfig) -> Self {
        Self { encoder }
    }

    pub fn encoder(&self) -> &EncoderConfig {
        &self.encoder
    }

    /// Primary plan for the job's mode
    pub fn compile(&self, mode: ExecutionMode, job: &CompositionJob, names: &StagingNames) -> ExecutionPlan {
        match mode {
            ExecutionMode::CopyConcat => self.copy_concat_plan(names),
            ExecutionMode::BgmFastMix | ExecutionMode::Reencode => {
                let graph = Self::filter_graph(mode, job);
                let profile = match mode {
                    ExecutionMode::BgmFastMix => &self.encoder.bgm_mix_audio,
                    _ => &self.encoder.reencode_audio,
                };
                let with_background = job.background().is_some();
                self.graph_plan(mode, graph, names, with_background, profile)
            }
        }
    }

    /// Re-encode plan used when the copy concat fails, e.g. on mismatched
    /// codec parameters between lead and body
    pub fn copy_fallback(&self, names: &StagingNames) -> ExecutionPlan {
        self.graph_plan(
            ExecutionMode::CopyConcat,
            build_graph(None, None),
            names,
            false,
            &self.encoder.copy_fallback_audio,
        )
    }

    /// Filter graph expression for a re-encoding mode
    pub fn filter_graph(mode: ExecutionMode, job: &CompositionJob) -> String {
        let speed = (mode == ExecutionMode::Reencode).then(|| job.speed_factor());
        let background_volume = job.background().map(|_| job.background_volume());

        build_graph(speed, background_volume)
    }

    fn copy_concat_plan(&self, names: &StagingNames) -> ExecutionPlan {
        let list = concat_list(&[&names.lead, &names.body]);

        let arguments = args([
            "-f", "concat",
            "-safe", "0",
            "-i", &names.concat_list,
            "-c", "copy",
            "-movflags", "faststart",
            "-y", &names.output,
        ]);

        ExecutionPlan {
            mode: ExecutionMode::CopyConcat,
            filter_graph: None,
            arguments,
            support_files: vec![SupportFile {
                name: names.concat_list.clone(),
                contents: list.into_bytes(),
            }],
        }
    }

    fn graph_plan(
        &self,
        mode: ExecutionMode,
        graph: String,
        names: &StagingNames,
        with_background: bool,
        profile: &AudioProfile,
    ) -> ExecutionPlan {
        let mut arguments = args(["-i", &names.lead, "-i", &names.body]);
        if with_background {
            if let Some(background) = &names.background {
                arguments.extend(args(["-i", background]));
            }
        }

        arguments.extend(args([
            "-filter_complex", &graph,
            "-map", VIDEO_OUT,
            "-map", AUDIO_OUT,
        ]));
        arguments.extend(self.encode_args(profile));
        arguments.extend(args(["-y", &names.output]));

        ExecutionPlan {
            mode,
            filter_graph: Some(graph),
            arguments,
            support_files: Vec::new(),
        }
    }

    fn encode_args(&self, profile: &AudioProfile) -> Vec<String> {
        let encoder = &self.encoder;
        let crf = encoder.crf.to_string();

        let mut out = args([
            "-c:v", &encoder.video_codec,
            "-preset", &encoder.preset,
            "-crf", &crf,
        ]);
        if profile.zero_latency {
            out.extend(args(["-tune", "zerolatency"]));
        }
        out.extend(args([
            "-pix_fmt", &encoder.pixel_format,
            "-c:a", &encoder.audio_codec,
            "-b:a", &profile.bitrate,
        ]));
        if let Some(rate) = profile.sample_rate {
            out.extend(args(["-ar", &rate.to_string()]));
        }
        out.extend(args([
            "-movflags", "faststart",
            "-threads", &encoder.threads.to_string(),
        ]));
        out
    }
}

/// Video timestamp multiplier: `setpts=<1/speed>*PTS`
pub fn setpts_filter(speed_factor: f64) -> String {
    format!("setpts={}*PTS", format_coefficient(1.0 / speed_factor))
}

/// Audio tempo filter: `atempo=<speed>`
pub fn atempo_filter(speed_factor: f64) -> String {
    format!("atempo={}", format_coefficient(speed_factor))
}

/// Six fixed decimals; never scientific notation
pub fn format_coefficient(value: f64) -> String {
    format!("{:.6}", value)
}

/// Two fixed decimals for gains
pub fn format_volume(value: f64) -> String {
    format!("{:.2}", value)
}

/// Concat-demuxer list, one quoted entry per line
pub fn concat_list(names: &[&str]) -> String {
    names
        .iter()
        .map(|name| format!("file '{}'", name.replace('\'', "'\\''")))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Concat of lead then body, with optional speed transform on every input
/// and optional BGM mixed under the concatenated audio
fn build_graph(speed: Option<f64>, background_volume: Option<f64>) -> String {
    let concat_audio = if background_volume.is_some() { "[cata]" } else { AUDIO_OUT };

    let mut graph = match speed {
        Some(speed) => {
            let setpts = setpts_filter(speed);
            let atempo = atempo_filter(speed);
            format!(
                "[0:v]{setpts}[v0];[0:a]{atempo}[a0];[1:v]{setpts}[v1];[1:a]{atempo}[a1];\
                 [v0][a0][v1][a1]concat=n=2:v=1:a=1{video}{audio}",
                setpts = setpts,
                atempo = atempo,
                video = VIDEO_OUT,
                audio = concat_audio,
            )
        }
        None => format!(
            "[0:v][0:a][1:v][1:a]concat=n=2:v=1:a=1{video}{audio}",
            video = VIDEO_OUT,
            audio = concat_audio,
        ),
    };

    // duration=first: the mix ends with the spliced audio, BGM is cut short
    if let Some(volume) = background_volume {
        graph.push_str(&format!(
            ";{audio}volume=1.0[mainaud];[2:a]volume={volume}[bgmaud];\
             [mainaud][bgmaud]amix=inputs=2:duration=first{out}",
            audio = concat_audio,
            volume = format_volume(volume),
            out = AUDIO_OUT,
        ));
    }

    graph
}

fn args<const N: usize>(items: [&str; N]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}
