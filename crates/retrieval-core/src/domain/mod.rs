//! Domain model: entities, value objects, and construction-time validation

pub mod configuration;
pub mod discovery;
pub mod errors;
pub mod execution;
pub mod ids;
pub mod messages;
pub mod patterns;
pub mod processed;

pub use configuration::{
    AzureBlobAuthType, AzureBlobSettings, FtpSettings, HttpsAuthType, HttpsSettings,
    ProtocolSettings, ProtocolTag, RetrievalConfiguration, Schedule,
};
pub use discovery::{DiscoveredFile, ListedFile};
pub use errors::DomainError;
pub use execution::{ErrorCategory, Execution, ExecutionStatus};
pub use ids::{ClientId, ConfigurationId, DiscoveredFileId, ETag, ExecutionId};
pub use messages::{
    ConfigurationCreatedEvent, ConfigurationDeletedEvent, ConfigurationUpdatedEvent,
    CreateConfigurationCommand, DeleteConfigurationCommand, DiscoveredFileProcessedEvent,
    DomainEvent, ExecuteFileCheckCommand, FileCheckCompletedEvent, FileCheckFailedEvent,
    FileCheckTriggeredEvent, FileDiscoveredEvent, MessageEnvelope, ProcessDiscoveredFileCommand,
    UpdateConfigurationCommand,
};
pub use patterns::PatternString;
pub use processed::ProcessedFileRecord;
