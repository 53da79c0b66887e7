// RTMP server configuration

use crate::{
    log::Logger,
    rtmp::{RTMP_CHUNK_SIZE_DEFAULT, RTMP_MAX_CHUNK_SIZE},
    utils::{
        get_env_bool, get_env_string, get_env_u32, get_env_u32_clamped, get_env_u32_in_range,
        DEFAULT_MAX_ID_LENGTH,
    },
};

const RTMP_PORT_DEFAULT: u32 = 1935;

const MAX_PORT: u32 = 65535;

const CHUNK_SIZE_DEFAULT: u32 = 4096;

const GOP_CACHE_LEN_DEFAULT: u32 = 2048;

const MSG_BUFFER_SIZE_DEFAULT: u32 = 8;

const MSG_BUFFER_SIZE_MAX: u32 = 1024;

/// RTMP server configuration
#[derive(Clone)]
pub struct RtmpServerConfiguration {
    /// Port
    pub port: u32,

    /// Bind address
    pub bind_address: String,

    /// RTMP chunk size for outbound messages
    pub chunk_size: usize,

    /// Max number of frames per cached group of pictures (0 disables the cache)
    pub gop_cache_len: usize,

    /// Size of the message buffer for sessions
    pub msg_buffer_size: usize,

    /// Max length for app and stream names
    pub id_max_length: usize,

    /// True to log requests
    pub log_requests: bool,
}

impl RtmpServerConfiguration {
    /// Loads configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `logger` - The logger
    pub fn load_from_env(logger: &Logger) -> Result<RtmpServerConfiguration, ()> {
        let port = get_env_u32_in_range(logger, "RTMP_PORT", RTMP_PORT_DEFAULT, 1, MAX_PORT)?;

        let bind_address = get_env_string("BIND_ADDRESS", "0.0.0.0");

        let chunk_size = get_env_u32_clamped(
            logger,
            "CHUNK_SIZE",
            CHUNK_SIZE_DEFAULT,
            RTMP_CHUNK_SIZE_DEFAULT as u32,
            RTMP_MAX_CHUNK_SIZE as u32,
        ) as usize;

        let gop_cache_len = get_env_u32("GOP_CACHE_LEN", GOP_CACHE_LEN_DEFAULT) as usize;

        let msg_buffer_size = get_env_u32_clamped(
            logger,
            "MSG_BUFFER_SIZE",
            MSG_BUFFER_SIZE_DEFAULT,
            1,
            MSG_BUFFER_SIZE_MAX,
        ) as usize;

        let id_max_length = get_env_u32("ID_MAX_LENGTH", DEFAULT_MAX_ID_LENGTH as u32) as usize;

        let log_requests = get_env_bool("LOG_REQUESTS", true);

        Ok(RtmpServerConfiguration {
            port,
            bind_address,
            chunk_size,
            gop_cache_len,
            msg_buffer_size,
            id_max_length,
            log_requests,
        })
    }

    /// Gets the TCP address for listening
    pub fn get_tcp_listen_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}
