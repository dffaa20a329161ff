//! PCM → WAV framing for Gemini speech output.
//!
//! Gemini TTS returns raw signed 16-bit little-endian PCM. Browsers cannot play that
//! directly from an `<audio>` element, so we prepend a canonical 44-byte RIFF header.

use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Sample rate of Gemini TTS output.
pub const GEMINI_SAMPLE_RATE: u32 = 24_000;
pub const GEMINI_CHANNELS: u16 = 1;
const BITS_PER_SAMPLE: u16 = 16;

pub fn pcm16_to_wav(pcm: &[u8], sample_rate: u32, channels: u16) -> Vec<u8> {
  let block_align = channels * (BITS_PER_SAMPLE / 8);
  let byte_rate = sample_rate * u32::from(block_align);
  let data_len = pcm.len() as u32;

  let mut out = Vec::with_capacity(44 + pcm.len());
  out.extend_from_slice(b"RIFF");
  out.extend_from_slice(&(36 + data_len).to_le_bytes());
  out.extend_from_slice(b"WAVE");
  out.extend_from_slice(b"fmt ");
  out.extend_from_slice(&16u32.to_le_bytes());
  out.extend_from_slice(&1u16.to_le_bytes()); // PCM
  out.extend_from_slice(&channels.to_le_bytes());
  out.extend_from_slice(&sample_rate.to_le_bytes());
  out.extend_from_slice(&byte_rate.to_le_bytes());
  out.extend_from_slice(&block_align.to_le_bytes());
  out.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());
  out.extend_from_slice(b"data");
  out.extend_from_slice(&data_len.to_le_bytes());
  out.extend_from_slice(pcm);
  out
}

/// Decode Gemini's base64 PCM and re-encode it as a base64 WAV file.
pub fn gemini_pcm_base64_to_wav_base64(pcm_b64: &str) -> Result<String, String> {
  let pcm = STANDARD.decode(pcm_b64.trim()).map_err(|e| format!("invalid base64 audio: {e}"))?;
  if pcm.is_empty() {
    return Err("empty audio payload".into());
  }
  Ok(STANDARD.encode(pcm16_to_wav(&pcm, GEMINI_SAMPLE_RATE, GEMINI_CHANNELS)))
}
