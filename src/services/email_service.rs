// src/services/email_service.rs

use std::sync::Arc;

use async_trait::async_trait;

// Colaborador de email. Só a recuperação de senha usa.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()>;
}

/// Não envia nada: registra o email no log. Padrão quando não há SMTP configurado.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        tracing::info!(to = %to, subject = %subject, "📧 Email (modo log): {}", body);
        Ok(())
    }
}

/// Dispara o envio sem esperar. Falha vira log, nunca erro para o chamador.
pub fn send_detached(mailer: Arc<dyn Mailer>, to: String, subject: String, body: String) {
    tokio::spawn(async move {
        if let Err(e) = mailer.send(&to, &subject, &body).await {
            tracing::warn!(to = %to, "Falha ao enviar email: {:?}", e);
        }
    });
}
